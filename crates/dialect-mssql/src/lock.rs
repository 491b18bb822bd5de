use std::time::Duration;

use driftql_core::{
    Error, ExecQuerier, Result, Value,
    driver::{Lock, Locker},
};

use crate::Mssql;

const GET_APPLOCK: &str = "\
DECLARE @r int; \
EXEC @r = sp_getapplock @Resource = @P1, @LockMode = 'Exclusive', \
    @LockOwner = 'Session', @LockTimeout = @P2; \
SELECT @r AS result";

const RELEASE_APPLOCK: &str = "\
DECLARE @r int; \
EXEC @r = sp_releaseapplock @Resource = @P1, @LockOwner = 'Session'; \
SELECT @r AS result";

/// Advisory locking via `sp_getapplock` with session ownership, so the lock
/// survives across batches until released or the session ends.
impl Locker for Mssql {
    fn lock(
        &self,
        conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        let rows = conn.query(
            GET_APPLOCK,
            &[
                Value::Text(name.to_string()),
                Value::Int(timeout.as_millis().min(i64::MAX as u128) as i64),
            ],
        )?;
        let result = rows
            .first()
            .and_then(|row| row.opt_int("result").ok().flatten())
            .unwrap_or(-999);
        // 0 granted, 1 granted after wait; negatives are timeouts/errors.
        if result < 0 {
            return Err(Error::Locked {
                name: name.to_string(),
                timeout,
            }
            .prefixed("mssql"));
        }
        Ok(Box::new(AppLock {
            name: name.to_string(),
            released: false,
        }))
    }
}

struct AppLock {
    name: String,
    released: bool,
}

impl Lock for AppLock {
    fn release(&mut self, conn: &mut dyn ExecQuerier) -> Result<()> {
        if self.released {
            return Err(Error::Internal(format!(
                "application lock {:?} already released",
                self.name
            )));
        }
        self.released = true;
        let rows = conn.query(RELEASE_APPLOCK, &[Value::Text(self.name.clone())])?;
        match rows
            .first()
            .and_then(|row| row.opt_int("result").ok().flatten())
        {
            Some(result) if result >= 0 => Ok(()),
            _ => Err(Error::Internal(format!(
                "application lock {:?} is no longer held by this session",
                self.name
            ))),
        }
    }
}
