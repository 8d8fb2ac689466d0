use crate::audio::source::StreamWriter;

/// A block of interleaved samples handed from a capture thread to the render side.
#[derive(Clone)]
pub struct AudioPacket {
  pub samples: Vec<f32>,
  pub sample_rate: f32,
  pub channels: u16,
  pub is_silent: bool,
}

impl Default for AudioPacket {
  fn default() -> Self {
    Self {
      samples: Vec::new(),
      sample_rate: 0.0,
      channels: 0,
      is_silent: true,
    }
  }
}

impl AudioPacket {
  /// Averages interleaved frames down to one channel.
  pub fn mix_to_mono(&self) -> Vec<f32> {
    let channels = self.channels.max(1) as usize;
    if self.is_silent {
      return vec![0.0; self.samples.len() / channels];
    }
    self
      .samples
      .chunks_exact(channels)
      .map(|frame| frame.iter().sum::<f32>() / channels as f32)
      .collect()
  }
}

/// Something that produces packets into a media stream until told to stop.
pub trait AudioBackend: Send {
  type Error;

  async fn run(self, tx: StreamWriter) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stereo_mixes_to_mean() {
    let packet = AudioPacket {
      samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
      sample_rate: 48_000.0,
      channels: 2,
      is_silent: false,
    };
    assert_eq!(packet.mix_to_mono(), vec![0.5, 0.5, 0.0]);
  }

  #[test]
  fn silent_packet_mixes_to_zeros() {
    let packet = AudioPacket {
      samples: vec![0.3; 8],
      sample_rate: 48_000.0,
      channels: 2,
      is_silent: true,
    };
    assert_eq!(packet.mix_to_mono(), vec![0.0; 4]);
  }
}
