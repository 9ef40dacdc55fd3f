//! Siren control seam.
//!
//! The audible siren is an external collaborator (an audio graph in the
//! dashboard frontend, a GPIO buzzer on an appliance build). The core only
//! needs start/stop, driven exclusively by the alarm arbiter: one start per
//! arming, one stop per acknowledgement.

/// Something that can sound the alarm.
pub trait Siren: Send {
    /// Begin sounding. Called exactly once per fire episode.
    fn start(&mut self);
    /// Stop sounding. Called on operator acknowledgement.
    fn stop(&mut self);
}

/// Siren that marks activation in the service log. Default for headless
/// deployments where the real siren lives in the frontend.
#[derive(Debug, Default)]
pub struct LogSiren {
    sounding: bool,
}

impl LogSiren {
    /// A silent, idle log siren.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the siren is currently sounding.
    pub fn is_sounding(&self) -> bool {
        self.sounding
    }
}

impl Siren for LogSiren {
    fn start(&mut self) {
        if self.sounding {
            return;
        }
        self.sounding = true;
        log::warn!("SIREN ON");
    }

    fn stop(&mut self) {
        if !self.sounding {
            return;
        }
        self.sounding = false;
        log::warn!("SIREN OFF");
    }
}

/// Siren that does nothing. For tests.
#[derive(Debug, Default)]
pub struct NullSiren;

impl Siren for NullSiren {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}
