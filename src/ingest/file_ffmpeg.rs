//! Local video file decoding using FFmpeg.
//!
//! Frames are decoded in-memory and converted to packed RGB24. Once the demuxer
//! runs dry the decoder is flushed, so trailing frames held back for reordering
//! are still delivered before end-of-stream.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::FileConfig;
use super::SourceStats;
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    draining: bool,
    finished: bool,
    last_error: Option<String>,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video file '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            draining: false,
            finished: false,
            last_error: None,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: opened {} (ffmpeg)", self.config.path);
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut decoded = ffmpeg::frame::Video::empty();
        if let Some(frame) = self.receive(&mut decoded)? {
            return Ok(Some(frame));
        }

        while !self.draining {
            let Some((stream, packet)) = self.input.packets().next() else {
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.draining = true;
                break;
            };
            let stream_index = stream.index();
            if stream_index != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet).map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("send packet to ffmpeg decoder")
            })?;
            if let Some(frame) = self.receive(&mut decoded)? {
                return Ok(Some(frame));
            }
        }

        let frame = self.receive(&mut decoded)?;
        if frame.is_none() {
            self.finished = true;
            log::info!(
                "FileSource: {} exhausted after {} frames",
                self.config.path,
                self.frame_count
            );
        }
        Ok(frame)
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.path.clone(),
        }
    }

    fn receive(&mut self, decoded: &mut ffmpeg::frame::Video) -> Result<Option<Frame>> {
        if self.decoder.receive_frame(decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        self.frame_count += 1;
        self.last_error = None;

        let frame = Frame::from_rgb(width, height, pixels)?;
        Ok(Some(frame.with_sequence(self.frame_count)))
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let pixels = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
