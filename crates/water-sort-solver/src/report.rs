//! Human-readable and JSON renderings of a search result.

use std::io::{self, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::SearchOutcome;
use crate::state::{Deal, Move, PuzzleState};

const INITIAL_STATE_TEXT: &str = "No action committed (initial state)";

/// Draw every container as a column, top layer first
pub fn render_state(state: &PuzzleState) -> String {
    let mut out = String::new();

    for i in 0..state.len() {
        let pad = if i < 9 { "   " } else { "  " };
        out.push_str(&format!("{pad}[{}]      ", i + 1));
    }
    out.push('\n');

    for layer in 0..crate::container::LAYERS {
        for container in state.containers() {
            let label = container.layer(layer).map_or("       ", |c| c.label());
            out.push_str(&format!("|{label}|   "));
        }
        out.push('\n');
    }

    for _ in 0..state.len() {
        out.push_str("---------   ");
    }
    out
}

/// One line describing the pour that produced a state
pub fn describe_move(mv: Option<&Move>) -> String {
    match mv {
        None => INITIAL_STATE_TEXT.to_string(),
        Some(mv) => format!(
            "Poured {:>2} mL of {} from bottle {:>2} to bottle {:>2}",
            mv.amount,
            mv.color.label(),
            mv.from,
            mv.to
        ),
    }
}

/// Format a duration as `00h : 00m : 00s : 000ms`
pub fn clock_format(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let ms = total_ms % 1000;
    let seconds = total_ms / 1000;
    let (hours, minutes, seconds) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
    format!("{hours:02}h : {minutes:02}m : {seconds:02}s : {ms:03}ms")
}

/// Write the metrics block followed by every step of the solution
pub fn write_text_report<W: Write>(
    out: &mut W,
    containers: usize,
    outcome: &SearchOutcome,
) -> io::Result<()> {
    let Some(path) = &outcome.solution else {
        return writeln!(out, "Problem unsolvable");
    };

    writeln!(out, "METRICS FOR {containers} BOTTLES:")?;
    writeln!(out, "-> Depth:          \t{}", path.depth())?;
    writeln!(out, "-> Total Nodes:    \t{}", outcome.peak_live)?;
    writeln!(out, "-> Examined Nodes: \t{}", outcome.examined)?;
    writeln!(out, "-> Elapsed Time:   \t{}", clock_format(outcome.elapsed))?;
    writeln!(out, "\n")?;

    let states = path.states();
    for (i, state) in states.iter().enumerate() {
        let mv = i
            .checked_sub(1)
            .and_then(|prev| state.describe_action(&states[prev]));
        writeln!(out, "{}\n", render_state(state))?;
        writeln!(out, "{:>2}. {}\n\n", i + 1, describe_move(mv.as_ref()))?;
    }
    Ok(())
}

/// Machine-readable result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOutput {
    pub solved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    pub examined_nodes: u64,
    pub peak_nodes: u64,
    pub discarded_nodes: u64,
    pub time_elapsed_ms: u64,
    /// The starting position, reusable as a `--deal` file
    pub deal: Deal,
    pub moves: Vec<Move>,
}

impl SolveOutput {
    pub fn new(initial: &PuzzleState, outcome: &SearchOutcome) -> Self {
        Self {
            solved: outcome.is_solved(),
            depth: outcome.depth(),
            examined_nodes: outcome.examined,
            peak_nodes: outcome.peak_live,
            discarded_nodes: outcome.discarded,
            time_elapsed_ms: outcome.elapsed.as_millis() as u64,
            deal: initial.to_deal(),
            moves: outcome
                .solution
                .as_ref()
                .map(|path| path.moves())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color::{Blue, Red};
    use crate::search::{breadth_first_search, SearchConfig};

    fn deal() -> PuzzleState {
        PuzzleState::from_deal(&Deal {
            bottles: vec![
                [None, Some(Red), Some(Blue), Some(Blue)],
                [None, Some(Red), Some(Red), Some(Red)],
                [None, None, Some(Blue), Some(Blue)],
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_render_state_grid() {
        let rendered = render_state(&deal());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "   [1]         [2]         [3]      ");
        assert_eq!(lines[1], "|       |   |       |   |       |   ");
        assert_eq!(lines[2], "|RED    |   |RED    |   |       |   ");
        assert_eq!(lines[4], "|BLUE   |   |RED    |   |BLUE   |   ");
        assert_eq!(lines[5], "---------   ---------   ---------   ");
    }

    #[test]
    fn test_describe_move() {
        let mv = Move {
            from: 3,
            to: 12,
            color: Blue,
            amount: 2,
        };
        assert_eq!(
            describe_move(Some(&mv)),
            "Poured  2 mL of BLUE    from bottle  3 to bottle 12"
        );
        assert_eq!(describe_move(None), INITIAL_STATE_TEXT);
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(
            clock_format(Duration::from_millis(3_723_045)),
            "01h : 02m : 03s : 045ms"
        );
        assert_eq!(clock_format(Duration::ZERO), "00h : 00m : 00s : 000ms");
    }

    #[test]
    fn test_text_report_lists_every_step() {
        let initial = deal();
        let outcome = breadth_first_search(&initial, &SearchConfig::default()).unwrap();

        let mut buf = Vec::new();
        write_text_report(&mut buf, initial.len(), &outcome).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("METRICS FOR 3 BOTTLES:\n-> Depth:          \t2\n"));
        assert!(text.contains(&format!(" 1. {INITIAL_STATE_TEXT}")));
        assert!(text.contains(" 2. Poured  1 mL of RED     from bottle  1 to bottle  2"));
        assert!(text.contains(" 3. Poured  2 mL of BLUE    from bottle  1 to bottle  3"));
    }

    #[test]
    fn test_unsolvable_report() {
        let mixed = [Some(Red), Some(Blue), Some(Red), Some(Blue)];
        let initial = PuzzleState::from_deal(&Deal {
            bottles: vec![mixed; 3],
        })
        .unwrap();
        let outcome = breadth_first_search(&initial, &SearchConfig::default()).unwrap();

        let mut buf = Vec::new();
        write_text_report(&mut buf, 3, &outcome).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Problem unsolvable\n");

        let json = serde_json::to_value(SolveOutput::new(&initial, &outcome)).unwrap();
        assert_eq!(json["solved"], false);
        assert!(json.get("depth").is_none());
        assert_eq!(json["moves"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_json_output_round_trips_the_deal() {
        let initial = deal();
        let outcome = breadth_first_search(&initial, &SearchConfig::default()).unwrap();
        let output = SolveOutput::new(&initial, &outcome);

        let json = serde_json::to_string(&output).unwrap();
        let back: SolveOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.depth, Some(2));
        assert_eq!(PuzzleState::from_deal(&back.deal).unwrap(), initial);
        assert_eq!(back.moves, outcome.solution.unwrap().moves());
    }
}
