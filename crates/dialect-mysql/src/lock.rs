use std::time::Duration;

use driftql_core::{
    Error, ExecQuerier, Result, Value,
    driver::{Lock, Locker},
};

use crate::MySql;

const GET_LOCK: &str = "SELECT GET_LOCK(?, ?) AS acquired";
const RELEASE_LOCK: &str = "SELECT RELEASE_LOCK(?) AS released";

/// Advisory locking via `GET_LOCK`/`RELEASE_LOCK`. The lock is owned by the
/// session, so cross-process appliers contending for one name serialize on
/// the server.
impl Locker for MySql {
    fn lock(
        &self,
        conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        let rows = conn.query(
            GET_LOCK,
            &[
                Value::Text(name.to_string()),
                Value::Int(timeout.as_secs() as i64),
            ],
        )?;
        let acquired = rows
            .first()
            .and_then(|row| row.opt_int("acquired").ok().flatten());
        if acquired != Some(1) {
            return Err(Error::Locked {
                name: name.to_string(),
                timeout,
            });
        }
        Ok(Box::new(MySqlLock {
            name: name.to_string(),
            released: false,
        }))
    }
}

struct MySqlLock {
    name: String,
    released: bool,
}

impl Lock for MySqlLock {
    fn release(&mut self, conn: &mut dyn ExecQuerier) -> Result<()> {
        if self.released {
            return Err(Error::Internal(format!(
                "advisory lock {:?} already released",
                self.name
            )));
        }
        let rows = conn.query(RELEASE_LOCK, &[Value::Text(self.name.clone())])?;
        self.released = true;
        match rows
            .first()
            .and_then(|row| row.opt_int("released").ok().flatten())
        {
            Some(1) => Ok(()),
            // 0: held by another session; NULL: no such lock.
            _ => Err(Error::Internal(format!(
                "advisory lock {:?} is no longer held by this session",
                self.name
            ))),
        }
    }
}
