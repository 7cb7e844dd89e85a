use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Ac2ArtError;

/// Where a speaker's waveform lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformSource {
    /// An audio file decoded and resampled on load.
    AudioFile,
    /// Samples already stored as a numeric array at the corpus rate.
    StoredArray,
}

/// Where the two velum channels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelumSource {
    /// The last two raw channels were measured.
    Recorded,
    /// Predicted from the feature matrix by the velum model.
    Predicted,
}

/// Per-speaker processing recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub sample_rate: u32,
    /// Channels in the raw trajectory files.
    pub raw_width: usize,
    /// Zero channels appended before descriptors are written.
    pub pad_width: usize,
    pub waveform: WaveformSource,
    pub velum: VelumSource,
}

impl ChannelLayout {
    pub fn extended_width(&self) -> usize {
        self.raw_width + self.pad_width
    }

    pub fn needs_features(&self) -> bool {
        self.velum == VelumSource::Predicted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corpus {
    Mocha,
    Usc,
    Mngu0,
    Haskins,
}

impl Corpus {
    pub const ALL: [Corpus; 4] = [Corpus::Mocha, Corpus::Usc, Corpus::Mngu0, Corpus::Haskins];

    pub fn speakers(self) -> &'static [Speaker] {
        use Speaker::*;
        match self {
            // falh0 is only reachable as a single speaker target.
            Corpus::Mocha => &[Fsew0, Msak0, Faet0, Ffes0, Maps0, Mjjn0],
            Corpus::Usc => &[F1, F5, M1, M3],
            Corpus::Mngu0 => &[Mngu0],
            Corpus::Haskins => &[F01, F02, F03, F04, M01, M02, M03, M04],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Corpus::Mocha => "mocha",
            Corpus::Usc => "usc",
            Corpus::Mngu0 => "MNGU0",
            Corpus::Haskins => "Haskins",
        }
    }

    /// Prefix of a speaker's preprocessed directory.
    fn dataset_prefix(self) -> &'static str {
        match self {
            Corpus::Mocha => "mocha_",
            Corpus::Usc => "usc_timit_",
            Corpus::Mngu0 => "",
            Corpus::Haskins => "Haskins_",
        }
    }
}

impl Display for Corpus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Corpus {
    type Err = Ac2ArtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Corpus::ALL
            .into_iter()
            .find(|corpus| corpus.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Ac2ArtError::Config(format!("unknown corpus {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    Msak0,
    Fsew0,
    Faet0,
    Ffes0,
    Falh0,
    Maps0,
    Mjjn0,
    Mngu0,
    F1,
    F5,
    M1,
    M3,
    F01,
    F02,
    F03,
    F04,
    M01,
    M02,
    M03,
    M04,
}

impl Speaker {
    pub const ALL: [Speaker; 20] = [
        Speaker::Msak0,
        Speaker::Fsew0,
        Speaker::Faet0,
        Speaker::Ffes0,
        Speaker::Falh0,
        Speaker::Maps0,
        Speaker::Mjjn0,
        Speaker::Mngu0,
        Speaker::F1,
        Speaker::F5,
        Speaker::M1,
        Speaker::M3,
        Speaker::F01,
        Speaker::F02,
        Speaker::F03,
        Speaker::F04,
        Speaker::M01,
        Speaker::M02,
        Speaker::M03,
        Speaker::M04,
    ];

    pub fn name(self) -> &'static str {
        use Speaker::*;
        match self {
            Msak0 => "msak0",
            Fsew0 => "fsew0",
            Faet0 => "faet0",
            Ffes0 => "ffes0",
            Falh0 => "falh0",
            Maps0 => "maps0",
            Mjjn0 => "mjjn0",
            Mngu0 => "MNGU0",
            F1 => "F1",
            F5 => "F5",
            M1 => "M1",
            M3 => "M3",
            F01 => "F01",
            F02 => "F02",
            F03 => "F03",
            F04 => "F04",
            M01 => "M01",
            M02 => "M02",
            M03 => "M03",
            M04 => "M04",
        }
    }

    pub fn corpus(self) -> Corpus {
        use Speaker::*;
        match self {
            Msak0 | Fsew0 | Faet0 | Ffes0 | Falh0 | Maps0 | Mjjn0 => Corpus::Mocha,
            Mngu0 => Corpus::Mngu0,
            F1 | F5 | M1 | M3 => Corpus::Usc,
            F01 | F02 | F03 | F04 | M01 | M02 | M03 | M04 => Corpus::Haskins,
        }
    }

    pub fn layout(self) -> ChannelLayout {
        use Speaker::*;
        match self {
            Msak0 | Fsew0 | Faet0 | Ffes0 | Falh0 => ChannelLayout {
                sample_rate: 16_000,
                raw_width: 14,
                pad_width: 5,
                waveform: WaveformSource::AudioFile,
                velum: VelumSource::Recorded,
            },
            Mngu0 | Maps0 | Mjjn0 => ChannelLayout {
                sample_rate: 16_000,
                raw_width: 12,
                pad_width: 7,
                waveform: WaveformSource::AudioFile,
                velum: VelumSource::Predicted,
            },
            F1 | F5 | M1 | M3 => ChannelLayout {
                sample_rate: 20_000,
                raw_width: 12,
                pad_width: 7,
                waveform: WaveformSource::StoredArray,
                velum: VelumSource::Predicted,
            },
            F01 | F02 | F03 | F04 | M01 | M02 | M03 | M04 => ChannelLayout {
                sample_rate: 44_100,
                raw_width: 12,
                pad_width: 7,
                waveform: WaveformSource::StoredArray,
                velum: VelumSource::Predicted,
            },
        }
    }

    /// Directory name under the preprocessed root.
    pub fn dataset_dir(self) -> String {
        format!("{}{}", self.corpus().dataset_prefix(), self.name())
    }

    /// Directory holding this speaker's waveforms under the raw root.
    pub fn waveform_dir(self, raw_root: &Path) -> PathBuf {
        let name = self.name();
        match self.corpus() {
            Corpus::Mocha => raw_root.join("mocha").join(name),
            Corpus::Usc => raw_root.join("usc_timit").join(name).join("wav_cut"),
            Corpus::Mngu0 => raw_root.join(name).join("wav"),
            Corpus::Haskins => raw_root
                .join("Haskins_IEEE_Rate_Comparison_DB")
                .join(name)
                .join("wav"),
        }
    }
}

impl Display for Speaker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Speaker {
    type Err = Ac2ArtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Speaker::ALL
            .into_iter()
            .find(|speaker| speaker.name() == s)
            .ok_or_else(|| Ac2ArtError::Config(format!("unknown speaker {s}")))
    }
}
