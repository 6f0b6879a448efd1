/// Types implementing BeanstalkSerialisable can be written to the server on
/// the client -> server side of a connection.
pub trait BeanstalkSerialisable {
    /// Produces the complete wire frame, including every trailing CRLF.
    fn serialise_beanstalk(&self) -> Vec<u8>;
}
