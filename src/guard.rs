use std::ops::{Deref, DerefMut};

use crate::merge::{check_and_merge, merge_outcome};
use crate::release::Release;

/// Owns a resource for the length of a scope and releases it exactly once on the way out.
///
/// The happy path ends with [ReleaseGuard::finish] or [ReleaseGuard::release_into], which merge
/// the release error with first-error-wins. If the scope is left some other way (a `?` return
/// before finishing, or a panic) the guard still releases on drop, but the error has no caller
/// to go to and only shows up as a `tracing` warning.
pub struct ReleaseGuard<R: Release> {
    resource: R,
    released: bool,
}

impl<R: Release> ReleaseGuard<R> {
    pub fn new(resource: R) -> Self {
        ReleaseGuard {
            resource,
            released: false,
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    /// Release the resource and fold the result into `outcome`.
    ///
    /// An `Err` outcome is returned untouched. An `Ok` outcome becomes the release error if
    /// releasing fails.
    pub fn finish<T, E>(mut self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<R::Error>,
    {
        self.released = true;
        let released = self.resource.release();
        merge_outcome(outcome, released)
    }

    /// Release the resource, recording its error in `slot` if `slot` is still empty.
    pub fn release_into<E>(mut self, slot: &mut Option<E>)
    where
        E: From<R::Error>,
    {
        self.released = true;
        check_and_merge(|| self.resource.release(), slot);
    }
}

impl<R: Release> Deref for ReleaseGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: Release> DerefMut for ReleaseGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R: Release> Drop for ReleaseGuard<R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.resource.release().is_err() {
            tracing::warn!(
                panicking = std::thread::panicking(),
                error_type = std::any::type_name::<R::Error>(),
                "release failed while leaving scope early, error dropped"
            );
        }
    }
}

/// Run `body` against `resource`, then release it, on every exit path.
///
/// Returns the body's error if it failed, otherwise the release error if releasing failed,
/// otherwise the body's value. A panic in `body` still releases the resource while unwinding.
pub fn with_release<R, T, E, F>(resource: R, body: F) -> Result<T, E>
where
    R: Release,
    E: From<R::Error>,
    F: FnOnce(&mut R) -> Result<T, E>,
{
    let mut guard = ReleaseGuard::new(resource);
    let outcome = body(guard.get_mut());
    guard.finish(outcome)
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::release::tests::{Resource, TestError};

    fn scoped(
        primary: Option<TestError>,
        secondary: Option<TestError>,
    ) -> (Result<u32, TestError>, u32) {
        let mut resource = Resource {
            on_release: secondary,
            releases: 0,
        };
        let result = with_release(&mut resource, |_| match primary {
            Some(error) => Err(error),
            None => Ok(7),
        });
        (result, resource.releases)
    }

    #[test]
    fn test_with_release_table() {
        assert_eq!(scoped(None, None), (Ok(7), 1));
        assert_eq!(scoped(None, Some(TestError::A)), (Err(TestError::A), 1));
        assert_eq!(scoped(Some(TestError::A), None), (Err(TestError::A), 1));
        assert_eq!(
            scoped(Some(TestError::A), Some(TestError::B)),
            (Err(TestError::A), 1)
        );
    }

    #[test]
    fn test_body_sees_resource() {
        let result: Result<u32, TestError> =
            with_release(Resource::default(), |resource| Ok(resource.releases));
        assert_eq!(result, Ok(0));
    }

    #[test]
    fn test_early_return_still_releases() {
        fn early(resource: &mut Resource, fail: bool) -> Result<(), TestError> {
            let guard = ReleaseGuard::new(resource);
            if fail {
                // leaves without finishing; drop takes care of it
                return Err(TestError::A);
            }
            guard.finish(Ok(()))
        }

        let mut resource = Resource::failing(TestError::B);
        assert_eq!(early(&mut resource, true), Err(TestError::A));
        assert_eq!(resource.releases, 1);

        let mut resource = Resource::failing(TestError::B);
        assert_eq!(early(&mut resource, false), Err(TestError::B));
        assert_eq!(resource.releases, 1);
    }

    #[test]
    fn test_panic_releases_during_unwind() {
        let mut resource = Resource::default();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), TestError> = with_release(&mut resource, |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(resource.releases, 1);
    }

    #[test]
    fn test_release_into_slot() {
        let mut slot: Option<TestError> = None;
        ReleaseGuard::new(Resource::failing(TestError::A)).release_into(&mut slot);
        ReleaseGuard::new(Resource::failing(TestError::B)).release_into(&mut slot);
        assert_eq!(slot, Some(TestError::A));

        let mut resource = Resource::default();
        let mut slot: Option<TestError> = None;
        ReleaseGuard::new(&mut resource).release_into(&mut slot);
        assert_eq!(slot, None);
        assert_eq!(resource.releases, 1);
    }

    #[test]
    fn test_guard_derefs_to_resource() {
        let mut guard = ReleaseGuard::new(Resource::default());
        guard.on_release = Some(TestError::B);
        assert_eq!(guard.releases, 0);
        assert_eq!(guard.finish(Ok::<(), TestError>(())), Err(TestError::B));
    }
}
