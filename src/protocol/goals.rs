//! Proof obligations returned by the `goal` call.

use serde::{Deserialize, Serialize};

use super::xml::Element;

/// One proof obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub identifier: String,
    /// Pre-formatted "name : type" lines.
    pub hypotheses: Vec<String>,
    pub conclusion: String,
}

/// Decoded answer to a goals query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Goals {
    /// The prover is not inside a proof.
    NotInProof,
    /// Foreground goals, in order.
    InProof(Vec<Goal>),
    /// The reply could not be decoded; carries a diagnostic.
    Undecodable(String),
}

impl Goals {
    /// Decode the `<value>` frame of a goals call (`None` when timed out).
    ///
    /// Expected shape:
    ///
    /// ```text
    /// <value val="good">
    ///   <option val="some">
    ///     <goals>
    ///       <list>                       foreground
    ///         <goal><string/><list>..</list><string/></goal>
    ///       </list>
    ///       <list>..</list>              background
    ///     </goals>
    ///   </option>
    /// </value>
    /// ```
    pub fn from_value(value: Option<&Element>) -> Self {
        let Some(value) = value else {
            return Goals::Undecodable("Invalid response (None)".into());
        };
        if value.attr("val") != Some("good") {
            return Goals::Undecodable("Bad request".into());
        }
        let Some(option) = value.child("option") else {
            return Goals::Undecodable("Bad request (no option)".into());
        };
        if option.attr("val") != Some("some") {
            return Goals::NotInProof;
        }
        match decode_foreground(option) {
            Some(goals) => Goals::InProof(goals),
            None => Goals::Undecodable("Failed to parse".into()),
        }
    }

    /// The foreground goals (empty unless in a proof).
    pub fn goals(&self) -> &[Goal] {
        match self {
            Goals::InProof(goals) => goals,
            _ => &[],
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Goals::Undecodable(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn in_proof(&self) -> bool {
        matches!(self, Goals::InProof(_))
    }

    /// Render the goals the way a goals pane shows them.
    ///
    /// Only the first goal lists its hypotheses. Outside of a proof the
    /// result is empty; an undecodable reply renders as its diagnostic.
    pub fn render(&self) -> String {
        let goals = match self {
            Goals::NotInProof => return String::new(),
            Goals::Undecodable(reason) => return reason.clone(),
            Goals::InProof(goals) => goals,
        };

        let total = goals.len();
        let plural = if total == 1 { "" } else { "s" };
        let mut lines = vec![format!("{total} subgoal{plural}"), String::new()];
        for (idx, goal) in goals.iter().enumerate() {
            if idx == 0 {
                lines.extend(goal.hypotheses.iter().cloned());
            }
            lines.push(String::new());
            lines.push(format!("======================== ( {} / {} )", idx + 1, total));
            lines.push(goal.conclusion.clone());
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

fn decode_foreground(option: &Element) -> Option<Vec<Goal>> {
    let goals = option.child("goals")?;
    let [foreground, _background] = goals.children.as_slice() else {
        return None;
    };
    foreground.children.iter().map(decode_goal).collect()
}

fn decode_goal(goal: &Element) -> Option<Goal> {
    let [id, hyps, conclusion] = goal.children.as_slice() else {
        return None;
    };
    if !id.is("string") || !hyps.is("list") || !conclusion.is("string") {
        return None;
    }
    Some(Goal {
        identifier: id.text.clone(),
        hypotheses: hyps.children.iter().map(|h| h.text.clone()).collect(),
        conclusion: conclusion.text.clone(),
    })
}
