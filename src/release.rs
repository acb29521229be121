/// Something that can be released at the end of its usage scope, and whose release might fail.
///
/// Closing a file handle, flushing a buffered writer, returning a lease: anything with a single
/// no-argument "give it back" step fits here.
pub trait Release {
    type Error;

    fn release(&mut self) -> Result<(), Self::Error>;
}

impl<R: Release + ?Sized> Release for &mut R {
    type Error = R::Error;

    fn release(&mut self) -> Result<(), Self::Error> {
        (**self).release()
    }
}

impl<R: Release + ?Sized> Release for Box<R> {
    type Error = R::Error;

    fn release(&mut self) -> Result<(), Self::Error> {
        (**self).release()
    }
}
