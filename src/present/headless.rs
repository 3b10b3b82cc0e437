use anyhow::Result;

use super::{Channel, DisplayImage, Presenter};

/// Headless presenter: records what would have been shown.
#[derive(Debug, Default)]
pub struct LogPresenter {
    shown: [u64; 4],
    closed: bool,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images received on `channel`.
    pub fn shown(&self, channel: Channel) -> u64 {
        self.shown[channel.index()]
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Presenter for LogPresenter {
    fn show(&mut self, channel: Channel, image: DisplayImage<'_>) -> Result<()> {
        let (width, height) = image.dimensions();
        self.shown[channel.index()] += 1;
        log::trace!("{}: {}x{}", channel.name(), width, height);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!(
                "LogPresenter: closed after {} frames",
                self.shown(Channel::SecurityFeed)
            );
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show(&mut self, _channel: Channel, _image: DisplayImage<'_>) -> Result<()> {
        Ok(())
    }
}
