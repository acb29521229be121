use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::{BoxFuture, FutureExt};

use crate::merge::{merge, merge_outcome};

/// Async counterpart of [crate::Release], for resources that have to await their shutdown
/// (flushing a socket, waiting on a background task).
pub trait AsyncRelease {
    type Error;

    fn release(&mut self) -> BoxFuture<'_, Result<(), Self::Error>>;
}

impl<R: AsyncRelease + ?Sized> AsyncRelease for &mut R {
    type Error = R::Error;

    fn release(&mut self) -> BoxFuture<'_, Result<(), Self::Error>> {
        (**self).release()
    }
}

impl<R: AsyncRelease + ?Sized> AsyncRelease for Box<R> {
    type Error = R::Error;

    fn release(&mut self) -> BoxFuture<'_, Result<(), Self::Error>> {
        (**self).release()
    }
}

/// Await `operation` and record its error in `slot` if `slot` is still empty.
/// The future is always awaited to completion, whatever the slot holds.
pub async fn check_and_merge_async<E, X, Fut>(operation: Fut, slot: &mut Option<E>)
where
    Fut: Future<Output = Result<(), X>>,
    E: From<X>,
{
    merge(operation.await, slot);
}

pub async fn release_and_merge_async<R, E>(mut resource: R, slot: &mut Option<E>)
where
    R: AsyncRelease,
    E: From<R::Error>,
{
    check_and_merge_async(resource.release(), slot).await;
}

/// Run the async `body` against `resource`, then await its release.
///
/// Same merge rule as [crate::with_release]. A panic inside `body` is caught long enough to
/// release the resource and then resumed. If this future is dropped before it completes, the
/// release is never awaited.
pub async fn with_release_async<R, T, E, F>(mut resource: R, body: F) -> Result<T, E>
where
    R: AsyncRelease,
    E: From<R::Error>,
    F: FnOnce(&mut R) -> BoxFuture<'_, Result<T, E>>,
{
    let outcome = AssertUnwindSafe(async { body(&mut resource).await })
        .catch_unwind()
        .await;
    let released = resource.release().await;
    match outcome {
        Ok(outcome) => merge_outcome(outcome, released),
        Err(panic) => {
            if released.is_err() {
                tracing::warn!(
                    error_type = std::any::type_name::<R::Error>(),
                    "release failed while unwinding, error dropped"
                );
            }
            std::panic::resume_unwind(panic)
        }
    }
}
