//! Remote firmware update session
//!
//! Image transport and flashing belong to the update collaborator. The
//! runtime only gives it one step per loop iteration and receives its
//! lifecycle events through [`UpdateObserver`].

/// Reasons an update session can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    /// Authentication with the update client failed
    Auth,
    /// Could not begin writing the new image
    Begin,
    /// Could not connect back to the update client
    Connect,
    /// Image transfer was interrupted
    Receive,
    /// Finalizing the image failed
    End,
}

impl UpdateError {
    /// Human-readable description
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateError::Auth => "Auth Failed",
            UpdateError::Begin => "Begin Failed",
            UpdateError::Connect => "Connect Failed",
            UpdateError::Receive => "Receive Failed",
            UpdateError::End => "End Failed",
        }
    }
}

/// Receiver of update session lifecycle events
pub trait UpdateObserver {
    /// An update has started
    fn on_start(&mut self);

    /// `progress` of `total` image bytes have been written
    fn on_progress(&mut self, progress: u32, total: u32);

    /// The update failed
    fn on_error(&mut self, error: UpdateError);

    /// The update finished
    fn on_end(&mut self);
}

/// One remote update channel
pub trait UpdateSession {
    /// Perform one bounded step of pending update work
    ///
    /// Called once per runtime loop iteration. Events produced by the step
    /// are delivered to `observer` before this returns.
    fn poll(&mut self, observer: &mut dyn UpdateObserver);
}
