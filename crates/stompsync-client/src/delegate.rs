/// The owner of a session: supplies credentials and receives notifications.
///
/// Notifications are delivered from inside the client's readiness and timer
/// callbacks. `on_closed` fires exactly once per session, after which no
/// other notification fires.
pub trait Delegate {
    /// Value of the CONNECT `login` header.
    fn login(&self) -> String;

    /// Value of the CONNECT `host` header.
    fn vhost(&self) -> String;

    /// Destination to subscribe to.
    fn channel(&self) -> String;

    /// The subscription was confirmed; invalidations may now flow.
    fn on_connected(&mut self);

    /// The session ended. Build a new client to reconnect.
    fn on_closed(&mut self);

    /// A decoded invalidation payload.
    fn on_invalidation(&mut self, payload: Vec<u8>);
}

impl<D: Delegate + ?Sized> Delegate for &mut D {
    fn login(&self) -> String {
        (**self).login()
    }

    fn vhost(&self) -> String {
        (**self).vhost()
    }

    fn channel(&self) -> String {
        (**self).channel()
    }

    fn on_connected(&mut self) {
        (**self).on_connected()
    }

    fn on_closed(&mut self) {
        (**self).on_closed()
    }

    fn on_invalidation(&mut self, payload: Vec<u8>) {
        (**self).on_invalidation(payload)
    }
}
