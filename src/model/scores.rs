use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The nine driving-score components.
///
/// Upstream keys five of them with punctuated names ("over.speeding",
/// "harsh.braking", ...). Scores embedded in a trip must carry all nine;
/// the standalone scores endpoint is decoded leniently through
/// [`ScoreEntry`] instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scores {
    #[serde(rename = "over.speeding")]
    pub over_speeding: f64,
    pub speeding: f64,
    #[serde(rename = "distracted.driving")]
    pub distracted_driving: f64,
    /// Pay-as-you-drive component: day, time and road type
    pub payd: f64,
    pub overall: f64,
    #[serde(rename = "harsh.cornering")]
    pub harsh_cornering: f64,
    #[serde(rename = "harsh.acceleration")]
    pub harsh_acceleration: f64,
    #[serde(rename = "harsh.braking")]
    pub harsh_braking: f64,
    pub mileage: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripScores {
    pub scores: Scores,
    pub score_type: i64,
}

/// One day of scores from the standalone scores endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct ScoreEntry {
    /// Scored day, epoch milliseconds
    pub date: i64,
    pub scores: Scores,
}

/// Wire shape of a scores-endpoint entry: the overall value sits in
/// `score` and each component under `componentScores.<key>.score`.
/// Components the service did not compute for the day are simply missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawScoreEntry {
    date: i64,
    score: Option<f64>,
    #[serde(default)]
    component_scores: HashMap<String, ComponentScore>,
}

#[derive(Debug, Deserialize)]
struct ComponentScore {
    score: Option<f64>,
}

impl RawScoreEntry {
    fn component(&self, key: &str) -> f64 {
        self.component_scores
            .get(key)
            .and_then(|c| c.score)
            .unwrap_or(0.0)
    }
}

impl From<RawScoreEntry> for ScoreEntry {
    fn from(raw: RawScoreEntry) -> Self {
        let scores = Scores {
            over_speeding: raw.component("over.speeding"),
            speeding: raw.component("speeding"),
            distracted_driving: raw.component("distracted.driving"),
            payd: raw.component("payd"),
            overall: raw.score.unwrap_or(0.0),
            harsh_cornering: raw.component("harsh.cornering"),
            harsh_acceleration: raw.component("harsh.acceleration"),
            harsh_braking: raw.component("harsh.braking"),
            mileage: raw.component("mileage"),
        };
        ScoreEntry {
            date: raw.date,
            scores,
        }
    }
}
