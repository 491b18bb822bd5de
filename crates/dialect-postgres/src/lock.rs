use std::time::{Duration, Instant};

use driftql_core::{
    Error, ExecQuerier, Result, Value,
    driver::{Lock, Locker},
};

use crate::Postgres;

const TRY_LOCK: &str = "SELECT pg_try_advisory_lock($1) AS acquired";
const UNLOCK: &str = "SELECT pg_advisory_unlock($1) AS released";
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Session-level advisory locking. Lock names hash to the bigint key space
/// with 32-bit FNV-1a, matching what other tools derive for the same name.
impl Locker for Postgres {
    fn lock(
        &self,
        conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        let key = i64::from(fnv1a_32(name));
        let deadline = Instant::now() + timeout;

        loop {
            let rows = conn.query(TRY_LOCK, &[Value::Int(key)])?;
            let acquired = rows
                .first()
                .map(|row| row.bool("acquired").unwrap_or(false))
                .unwrap_or(false);
            if acquired {
                return Ok(Box::new(PgLock {
                    name: name.to_string(),
                    key,
                    released: false,
                }));
            }
            if Instant::now() >= deadline {
                return Err(Error::Locked {
                    name: name.to_string(),
                    timeout,
                });
            }
            std::thread::sleep(RETRY_INTERVAL.min(timeout));
        }
    }
}

struct PgLock {
    name: String,
    key: i64,
    released: bool,
}

impl Lock for PgLock {
    fn release(&mut self, conn: &mut dyn ExecQuerier) -> Result<()> {
        if self.released {
            return Err(Error::Internal(format!(
                "advisory lock {:?} already released",
                self.name
            )));
        }
        self.released = true;
        let rows = conn.query(UNLOCK, &[Value::Int(self.key)])?;
        match rows.first().map(|row| row.bool("released").unwrap_or(false)) {
            Some(true) => Ok(()),
            _ => Err(Error::Internal(format!(
                "advisory lock {:?} is no longer held by this session",
                self.name
            ))),
        }
    }
}

fn fnv1a_32(name: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
