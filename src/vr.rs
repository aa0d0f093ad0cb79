//! External VR capability surface.
//!
//! Session lifecycle and pose tracking belong entirely to a platform VR
//! runtime; the world only flips between the window's own frame pacing and
//! the device's, and reacts to the session state this trait reports.

use anyhow::{Result, bail};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

pub trait VrRuntime {
    fn session_state(&self) -> SessionState;

    fn is_session_active(&self) -> bool {
        self.session_state() == SessionState::Active
    }

    /// Ask the device to start an immersive session.
    fn request_session(&mut self) -> Result<()>;

    /// Leave the immersive session. Idempotent.
    fn end_session(&mut self);

    /// Block until the device is ready for the next frame. While a session
    /// is active this replaces the window's redraw pacing.
    fn wait_frame(&mut self) {}
}

/// Fallback runtime used when no headset integration is linked in.
pub struct NoHeadset;

impl VrRuntime for NoHeadset {
    fn session_state(&self) -> SessionState {
        SessionState::Idle
    }

    fn request_session(&mut self) -> Result<()> {
        bail!("no VR headset runtime is available")
    }

    fn end_session(&mut self) {}
}
