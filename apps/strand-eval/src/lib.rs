use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use strand_config::Config;
use strand_service::{
	CloseThreadRequest, DecisionState, IngestMessageRequest, Providers, ResolutionMethod,
	ResolutionTrace, ResolverOverrides, StrandService,
};
use strand_storage::MemoryEventLog;

#[derive(Debug, Parser)]
#[command(
	version = strand_cli::VERSION,
	rename_all = "kebab",
	styles = strand_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Attach the resolution trace of every message to the report.
	#[arg(long)]
	pub trace: bool,
}

/// Labeled message stream, replayed in file order.
#[derive(Debug, Deserialize)]
pub struct EvalDataset {
	pub name: Option<String>,
	#[serde(default)]
	pub overrides: ResolverOverrides,
	pub messages: Vec<EvalMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EvalMessage {
	pub id: Option<String>,
	pub user_id: String,
	pub message_text: String,
	pub topic: String,
	#[serde(default)]
	pub topic_nuance: String,
	#[serde(default)]
	pub subtopics: Vec<String>,
	#[serde(default)]
	pub sentiment: String,
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	pub embedding: Option<Vec<f32>>,
	/// Label of the thread this message belongs to; compared pairwise within a user.
	pub expected_thread: String,
	/// Close the assigned thread right after this message is ingested.
	#[serde(default)]
	pub close_after: bool,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub dataset: EvalDatasetInfo,
	pub summary: EvalSummary,
	pub messages: Vec<MessageReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalDatasetInfo {
	pub name: String,
	pub messages: usize,
	pub users: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub pairs: PairCounts,
	pub pair_precision: f64,
	pub pair_recall: f64,
	pub pair_accuracy: f64,
	pub expected_threads: usize,
	pub predicted_threads: usize,
	pub fast_path: usize,
	pub scored: usize,
	pub new_threads: usize,
	pub duplicates: usize,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}

/// Confusion counts over every unordered pair of messages from the same user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PairCounts {
	pub true_positive: usize,
	pub false_positive: usize,
	pub false_negative: usize,
	pub true_negative: usize,
}
impl PairCounts {
	pub fn precision(&self) -> f64 {
		ratio(self.true_positive, self.true_positive + self.false_positive)
	}

	pub fn recall(&self) -> f64 {
		ratio(self.true_positive, self.true_positive + self.false_negative)
	}

	pub fn accuracy(&self) -> f64 {
		ratio(
			self.true_positive + self.true_negative,
			self.true_positive + self.false_positive + self.false_negative + self.true_negative,
		)
	}
}

#[derive(Debug, Serialize)]
pub struct MessageReport {
	pub id: String,
	pub user_id: String,
	pub expected_thread: String,
	pub thread_id: String,
	pub state: DecisionState,
	pub method: Option<ResolutionMethod>,
	pub score: Option<f32>,
	pub intensifying: bool,
	pub reference_past_issue: bool,
	pub duplicate: bool,
	pub closed: bool,
	pub latency_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trace: Option<ResolutionTrace>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = strand_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let dataset = load_dataset(args.dataset.as_path())?;
	let output = evaluate(config, &dataset, args.trace).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.messages.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one message."));
	}

	Ok(dataset)
}

/// Replays the dataset against a fresh in-memory service and scores the thread assignments.
pub async fn evaluate(
	config: Config,
	dataset: &EvalDataset,
	trace: bool,
) -> color_eyre::Result<EvalOutput> {
	let service = StrandService::new(config, Arc::new(MemoryEventLog::new()), Providers::default())?;
	let mut reports = Vec::with_capacity(dataset.messages.len());
	let mut latencies_ms = Vec::with_capacity(dataset.messages.len());

	for (idx, message) in dataset.messages.iter().enumerate() {
		let id = message.id.clone().unwrap_or_else(|| format!("m{}", idx + 1));
		let started = Instant::now();
		let response = service
			.ingest_message(IngestMessageRequest {
				user_id: message.user_id.clone(),
				message_text: message.message_text.clone(),
				topic: message.topic.clone(),
				topic_nuance: message.topic_nuance.clone(),
				subtopics: message.subtopics.clone(),
				sentiment: message.sentiment.clone(),
				timestamp: Some(message.timestamp),
				embedding: message.embedding.clone(),
				overrides: dataset.overrides.clone(),
				trace,
			})
			.await
			.map_err(|err| eyre::eyre!("Message {id} failed: {err}"))?;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
		let closed = message.close_after && !response.duplicate;

		if closed {
			service
				.close_thread(CloseThreadRequest {
					user_id: message.user_id.clone(),
					thread_id: response.thread_id.clone(),
					summary: None,
					resolved_at: Some(message.timestamp),
				})
				.await
				.map_err(|err| eyre::eyre!("Closing thread after {id} failed: {err}"))?;
		}

		tracing::debug!(
			id = %id,
			thread_id = %response.thread_id,
			state = ?response.state,
			"Message replayed."
		);

		latencies_ms.push(latency_ms);
		reports.push(MessageReport {
			id,
			user_id: message.user_id.clone(),
			expected_thread: message.expected_thread.clone(),
			thread_id: response.thread_id,
			state: response.state,
			method: response.method,
			score: response.score,
			intensifying: response.intensifying,
			reference_past_issue: response.reference_past_issue,
			duplicate: response.duplicate,
			closed,
			latency_ms,
			trace: response.trace,
		});
	}

	let users: BTreeSet<&str> = dataset.messages.iter().map(|m| m.user_id.as_str()).collect();
	let info = EvalDatasetInfo {
		name: dataset.name.clone().unwrap_or_else(|| "unnamed".to_string()),
		messages: dataset.messages.len(),
		users: users.len(),
	};
	let summary = summarize(&reports, &latencies_ms);

	Ok(EvalOutput { dataset: info, summary, messages: reports })
}

/// Compares predicted and expected co-membership for every same-user pair.
pub fn pair_counts(reports: &[MessageReport]) -> PairCounts {
	let mut by_user: BTreeMap<&str, Vec<&MessageReport>> = BTreeMap::new();
	let mut counts = PairCounts::default();

	for report in reports {
		by_user.entry(report.user_id.as_str()).or_default().push(report);
	}

	for messages in by_user.values() {
		for (i, left) in messages.iter().enumerate() {
			for right in &messages[i + 1..] {
				let predicted = left.thread_id == right.thread_id;
				let expected = left.expected_thread == right.expected_thread;

				match (predicted, expected) {
					(true, true) => counts.true_positive += 1,
					(true, false) => counts.false_positive += 1,
					(false, true) => counts.false_negative += 1,
					(false, false) => counts.true_negative += 1,
				}
			}
		}
	}

	counts
}

fn summarize(reports: &[MessageReport], latencies_ms: &[f64]) -> EvalSummary {
	let pairs = pair_counts(reports);
	let expected_threads: BTreeSet<(&str, &str)> =
		reports.iter().map(|r| (r.user_id.as_str(), r.expected_thread.as_str())).collect();
	let predicted_threads: BTreeSet<(&str, &str)> =
		reports.iter().map(|r| (r.user_id.as_str(), r.thread_id.as_str())).collect();
	let fresh = reports.iter().filter(|r| !r.duplicate);
	let fast_path = fresh.clone().filter(|r| r.method == Some(ResolutionMethod::FastPath)).count();
	let scored = fresh
		.clone()
		.filter(|r| {
			r.method == Some(ResolutionMethod::Scored) && r.state == DecisionState::Accepted
		})
		.count();
	let new_threads = fresh.filter(|r| r.state == DecisionState::NewThread).count();
	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(|a, b| a.total_cmp(b));

	EvalSummary {
		pairs,
		pair_precision: pairs.precision(),
		pair_recall: pairs.recall(),
		pair_accuracy: pairs.accuracy(),
		expected_threads: expected_threads.len(),
		predicted_threads: predicted_threads.len(),
		fast_path,
		scored,
		new_threads,
		duplicates: reports.iter().filter(|r| r.duplicate).count(),
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
	}
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
	if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] + (values[upper] - values[lower]) * weight
	}
}
