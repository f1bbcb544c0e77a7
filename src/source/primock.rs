use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::constants::primock::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, PROGRESS_EVERY, SOURCE_ID};
use crate::ids::ConsultationKey;
use crate::source::{ConsultationTranscripts, InMemoryConsultations};
use crate::types::Transcript;
use crate::utils::strip_markup_tags;

static INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)intervals\s*\[\d+\]:\s*xmin\s*=\s*([\d.]+)\s*xmax\s*=\s*([\d.]+)\s*text\s*=\s*"([^"]*)""#,
    )
    .expect("textgrid interval pattern is valid")
});

/// Speaker channel of a PriMock57 recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    /// Clinician channel.
    Doctor,
    /// Patient channel.
    Patient,
}

impl Speaker {
    /// Tag used in transcripts and TextGrid file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::Doctor => "doctor",
            Speaker::Patient => "patient",
        }
    }
}

/// One timed interval from a TextGrid tier.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    /// Start time in seconds.
    pub from: f64,
    /// End time in seconds.
    pub to: f64,
    /// Cleaned utterance text.
    pub text: String,
}

/// Extract non-empty intervals from TextGrid content, markup removed.
pub fn parse_textgrid(content: &str) -> Vec<Utterance> {
    INTERVAL
        .captures_iter(content)
        .filter_map(|captures| {
            let from = captures[1].parse::<f64>().ok()?;
            let to = captures[2].parse::<f64>().ok()?;
            let text = strip_markup_tags(captures[3].trim());
            (!text.is_empty()).then_some(Utterance { from, to, text })
        })
        .collect()
}

/// Merge doctor and patient tiers into `[speaker] text` lines ordered by start time.
///
/// The sort is stable, so a doctor utterance precedes a patient utterance
/// starting at the same instant.
pub fn combine_transcript(doctor_content: &str, patient_content: &str) -> Transcript {
    let mut combined: Vec<(Speaker, Utterance)> = parse_textgrid(doctor_content)
        .into_iter()
        .map(|utterance| (Speaker::Doctor, utterance))
        .chain(
            parse_textgrid(patient_content)
                .into_iter()
                .map(|utterance| (Speaker::Patient, utterance)),
        )
        .collect();
    combined.sort_by(|a, b| a.1.from.partial_cmp(&b.1.from).unwrap_or(Ordering::Equal));
    combined
        .iter()
        .map(|(speaker, utterance)| format!("[{}] {}", speaker.as_str(), utterance.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Connection settings for the PriMock57 transcript host.
#[derive(Clone, Debug)]
pub struct PrimockConfig {
    /// Directory URL holding `*.TextGrid` files.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for PrimockConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PrimockConfig {
    /// TextGrid URL for one speaker of a consultation.
    pub fn textgrid_url(&self, key: ConsultationKey, speaker: Speaker) -> String {
        format!(
            "{}/{}_{}.TextGrid",
            self.base_url.trim_end_matches('/'),
            key.file_stem(),
            speaker.as_str()
        )
    }
}

/// Live PriMock57 transcript fetcher.
pub struct PrimockClient {
    config: PrimockConfig,
    agent: Agent,
}

impl PrimockClient {
    /// Build a client with its own HTTP agent.
    pub fn new(config: PrimockConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { config, agent }
    }

    /// Active configuration.
    pub fn config(&self) -> &PrimockConfig {
        &self.config
    }

    fn fetch_textgrid(&self, url: &str) -> Option<String> {
        debug!("[simord:primock] fetching {url}");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(err) => {
                warn!("[simord:primock] failed fetching {url}: {err}");
                return None;
            }
        };
        match response.into_body().read_to_string() {
            Ok(body) => Some(body),
            Err(err) => {
                warn!("[simord:primock] failed reading {url}: {err}");
                None
            }
        }
    }

    /// Fetch every consultation in `keys`, logging progress and failures.
    pub fn prefetch<I>(&self, keys: I) -> InMemoryConsultations
    where
        I: IntoIterator<Item = ConsultationKey>,
    {
        let keys: Vec<ConsultationKey> = keys.into_iter().collect();
        info!(
            "[simord:primock] loading {} transcripts from {}",
            keys.len(),
            self.config.base_url
        );
        let mut store = InMemoryConsultations::new(SOURCE_ID);
        for (idx, key) in keys.iter().enumerate() {
            if (idx + 1) % PROGRESS_EVERY == 0 {
                info!("[simord:primock] progress {}/{}", idx + 1, keys.len());
            }
            match self.transcript(*key) {
                Some(transcript) => store.insert(*key, transcript),
                None => warn!("[simord:primock] no transcript for {key}"),
            }
        }
        info!("[simord:primock] loaded {} transcripts", store.len());
        store
    }
}

impl ConsultationTranscripts for PrimockClient {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn transcript(&self, key: ConsultationKey) -> Option<Transcript> {
        let doctor = self.fetch_textgrid(&self.config.textgrid_url(key, Speaker::Doctor))?;
        let patient = self.fetch_textgrid(&self.config.textgrid_url(key, Speaker::Patient))?;
        Some(combine_transcript(&doctor, &patient))
    }
}
