use crate::release::Release;

/// Run `operation` and record its error in `slot`, unless `slot` already holds an earlier one.
///
/// `operation` always runs exactly once, even when `slot` is already set: the side effect
/// (actually closing the thing) matters more than its error. The first recorded error wins.
pub fn check_and_merge<E, X, F>(operation: F, slot: &mut Option<E>)
where
    F: FnOnce() -> Result<(), X>,
    E: From<X>,
{
    merge(operation(), slot);
}

/// Release `resource` and merge its error into `slot` with the same rules as [check_and_merge].
pub fn release_and_merge<R, E>(mut resource: R, slot: &mut Option<E>)
where
    R: Release,
    E: From<R::Error>,
{
    check_and_merge(|| resource.release(), slot);
}

pub(crate) fn merge<E, X>(outcome: Result<(), X>, slot: &mut Option<E>)
where
    E: From<X>,
{
    if let Err(error) = outcome {
        if slot.is_none() {
            *slot = Some(E::from(error));
        } else {
            discarded::<X>();
        }
    }
}

/// Combine a whole outcome with the result of releasing afterwards: an earlier `Err` wins, a
/// release error only replaces an `Ok`.
pub(crate) fn merge_outcome<T, E, X>(outcome: Result<T, E>, released: Result<(), X>) -> Result<T, E>
where
    E: From<X>,
{
    match outcome {
        Ok(value) => released.map(|()| value).map_err(E::from),
        Err(primary) => {
            if released.is_err() {
                discarded::<X>();
            }
            Err(primary)
        }
    }
}

fn discarded<X>() {
    tracing::debug!(
        error_type = std::any::type_name::<X>(),
        "release failed after an earlier error, keeping the earlier error"
    );
}
