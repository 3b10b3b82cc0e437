//! On-screen windows using minifb.
//!
//! One window per channel, created the first time that channel is shown and reused
//! afterwards. Pressing 'q' in any window, or closing one, raises the stop flag.

use anyhow::{anyhow, Result};
use minifb::{Key, ScaleMode, Window, WindowOptions};

use super::{Channel, DisplayImage, Presenter};
use crate::pipeline::StopFlag;

pub struct WindowPresenter {
    windows: [Option<Window>; 4],
    stop: StopFlag,
}

impl WindowPresenter {
    pub fn new(stop: StopFlag) -> Self {
        Self {
            windows: [None, None, None, None],
            stop,
        }
    }

    fn window_for(&mut self, channel: Channel, width: usize, height: usize) -> Result<&mut Window> {
        let slot = &mut self.windows[channel.index()];
        if slot.is_none() {
            let mut window = Window::new(
                &format!("{} - q to quit", channel.name()),
                width,
                height,
                WindowOptions {
                    resize: true,
                    scale_mode: ScaleMode::AspectRatioStretch,
                    ..WindowOptions::default()
                },
            )
            .map_err(|err| anyhow!("open window {}: {}", channel.name(), err))?;
            let (x, y) = channel.position();
            window.set_position(x, y);
            // The pipeline paces itself; never sleep inside update.
            window.set_target_fps(0);
            log::debug!("WindowPresenter: opened {} ({}x{})", channel.name(), width, height);
            *slot = Some(window);
        }
        slot.as_mut()
            .ok_or_else(|| anyhow!("window {} missing", channel.name()))
    }
}

impl Presenter for WindowPresenter {
    fn show(&mut self, channel: Channel, image: DisplayImage<'_>) -> Result<()> {
        let (width, height) = image.dimensions();
        let (width, height) = (width as usize, height as usize);
        let argb = image.to_argb();

        let stop = self.stop.clone();
        let window = self.window_for(channel, width, height)?;
        window
            .update_with_buffer(&argb, width, height)
            .map_err(|err| anyhow!("update window {}: {}", channel.name(), err))?;

        if !window.is_open() || window.is_key_down(Key::Q) {
            log::info!("WindowPresenter: quit requested from {}", channel.name());
            stop.raise();
        }
        Ok(())
    }

    fn close(&mut self) {
        for slot in &mut self.windows {
            slot.take();
        }
    }
}
