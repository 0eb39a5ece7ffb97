//! Race an upstream call against the internal deadline

use std::future::Future;
use std::time::Duration;
use log::debug;

/// Outcome of racing a future against a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T>
{   /// The future resolved first; the timer was dropped
    Finished(T)
  , /// The timer fired first; the future was dropped mid-flight
    Expired
}

/// Poll `work` and a `limit` timer together. Whichever resolves first
/// wins and the other side is dropped before this returns, so an
/// aborted request never outlives the caller and neither does the timer.
pub async fn race<F>(work: F, limit: Duration) -> Raced<F::Output>
where F: Future
{   let timer = tokio::time::sleep(limit);
    tokio::pin!(work);
    tokio::pin!(timer);

    tokio::select!
    { biased;
      output = &mut work => Raced::Finished(output)
    , _ = &mut timer => {
        debug!("Deadline of {:?} reached, dropping work", limit);
        Raced::Expired
      }
    }
}
