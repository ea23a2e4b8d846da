use std::io::{self, Write};

use crate::{
    expr::Expr,
    plat::{MemoryAccess, PResult, PlatformError, RegisterAccess, WatchpointHit},
};

/// How many watchpoints can be armed at once.
pub const NR_WP: usize = 32;

/// An armed watchpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchpoint {
    pub no: u32,
    /// The expression as the operator typed it.
    pub text: String,
    expr: Expr,
    /// Value at the last check.
    pub value: i32,
    pub hits: u32,
}

/// A fixed pool of numbered watchpoint slots.
///
/// The pool holds no slots until [`init`](WatchpointPool::init) is called.
#[derive(Debug, Default)]
pub struct WatchpointPool {
    slots: Vec<Option<Watchpoint>>,
}

impl WatchpointPool {
    /// Empties the pool and makes all [`NR_WP`] slots available.
    pub fn init(&mut self) {
        self.slots = std::iter::repeat_with(|| None).take(NR_WP).collect();
    }

    pub fn is_initialized(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Arms a watchpoint in the lowest free slot and returns its number.
    pub fn arm(&mut self, text: &str, expr: Expr, value: i32) -> PResult<u32> {
        if !self.is_initialized() {
            return Err(PlatformError::PoolUninitialized);
        }
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(PlatformError::PoolExhausted(NR_WP))?;
        let no = index as u32;
        *slot = Some(Watchpoint {
            no,
            text: text.trim().to_string(),
            expr,
            value,
            hits: 0,
        });
        Ok(no)
    }

    pub fn remove(&mut self, no: u32) -> PResult<Watchpoint> {
        self.slots
            .get_mut(no as usize)
            .and_then(Option::take)
            .ok_or(PlatformError::NoSuchWatchpoint(no))
    }

    /// Iterates over armed watchpoints in number order.
    pub fn iter(&self) -> impl Iterator<Item = &Watchpoint> {
        self.slots.iter().flatten()
    }

    /// Re-evaluates every watchpoint and records new values.
    ///
    /// Returns the lowest-numbered watchpoint whose value changed. Expressions that fail to
    /// evaluate keep their old value.
    pub fn check<E>(&mut self, env: &E) -> Option<WatchpointHit>
    where
        E: RegisterAccess + MemoryAccess + ?Sized,
    {
        let mut hit = None;
        for wp in self.slots.iter_mut().flatten() {
            match wp.expr.eval(env) {
                Ok(new) if new != wp.value => {
                    let old = std::mem::replace(&mut wp.value, new);
                    wp.hits += 1;
                    if hit.is_none() {
                        hit = Some(WatchpointHit {
                            no: wp.no,
                            expr: wp.text.clone(),
                            old,
                            new,
                        });
                    }
                }
                Ok(_) => {}
                Err(err) => log::debug!("watchpoint {}: {}", wp.no, err),
            }
        }
        hit
    }

    pub fn display(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.iter().next().is_none() {
            return writeln!(out, "No watchpoints.");
        }
        writeln!(out, "{:<6}{:<14}{:<6}What", "Num", "Value", "Hits")?;
        for wp in self.iter() {
            writeln!(
                out,
                "{:<6}{:<14}{:<6}{}",
                wp.no,
                format!("0x{:08x}", wp.value as u32),
                wp.hits,
                wp.text
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{tests::TestEnv, ExprEngine};

    fn armed(pool: &mut WatchpointPool, text: &str, value: i32) -> u32 {
        let expr = ExprEngine::new().parse(text).unwrap();
        pool.arm(text, expr, value).unwrap()
    }

    #[test]
    fn test_uninitialized() {
        let mut pool = WatchpointPool::default();
        assert!(!pool.is_initialized());
        assert_eq!(
            pool.arm("1", Expr::Literal(1), 1),
            Err(PlatformError::PoolUninitialized)
        );
    }

    #[test]
    fn test_arm_and_remove() {
        let mut pool = WatchpointPool::default();
        pool.init();
        assert_eq!(armed(&mut pool, "$a0", 10), 0);
        assert_eq!(armed(&mut pool, "$sp", 0x100), 1);
        assert_eq!(pool.remove(0).unwrap().text, "$a0");
        assert_eq!(pool.remove(0), Err(PlatformError::NoSuchWatchpoint(0)));
        assert_eq!(pool.remove(99), Err(PlatformError::NoSuchWatchpoint(99)));
        // freed slots are reused lowest first
        assert_eq!(armed(&mut pool, "pc", 0), 0);
        let nos: Vec<u32> = pool.iter().map(|wp| wp.no).collect();
        assert_eq!(nos, vec![0, 1]);
    }

    #[test]
    fn test_exhausted() {
        let mut pool = WatchpointPool::default();
        pool.init();
        for _ in 0..NR_WP {
            armed(&mut pool, "1", 1);
        }
        assert_eq!(
            pool.arm("1", Expr::Literal(1), 1),
            Err(PlatformError::PoolExhausted(NR_WP))
        );
    }

    #[test]
    fn test_check() {
        let mut pool = WatchpointPool::default();
        pool.init();
        armed(&mut pool, "$a0", 10);
        armed(&mut pool, "$sp", 0);
        armed(&mut pool, "pc", 0);
        let hit = pool.check(&TestEnv).unwrap();
        assert_eq!(
            hit,
            WatchpointHit {
                no: 1,
                expr: "$sp".to_string(),
                old: 0,
                new: 0x100
            }
        );
        let hits: Vec<u32> = pool.iter().map(|wp| wp.hits).collect();
        assert_eq!(hits, vec![0, 1, 1]);
        assert_eq!(pool.check(&TestEnv), None);
    }

    #[test]
    fn test_display() {
        let mut pool = WatchpointPool::default();
        pool.init();
        let mut out = Vec::new();
        pool.display(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No watchpoints.\n");

        armed(&mut pool, "$a0 + 1", 11);
        let mut out = Vec::new();
        pool.display(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Num   Value         Hits  What\n0     0x0000000b    0     $a0 + 1\n"
        );
    }
}
