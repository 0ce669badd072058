use crate::models::{DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};
use crate::session::{Annotator, Outcome, Phase};
use std::io::{self, Write};

/// Print the configured sources, marking the active one
pub fn print_sources(out: &mut impl Write, annotator: &Annotator) -> io::Result<()> {
    writeln!(out, "📁 SOURCES")?;
    writeln!(out, "----------")?;
    for source in annotator.sources() {
        let marker = if annotator.active_key() == Some(source.key.as_str()) {
            "*"
        } else {
            " "
        };
        writeln!(out, "{} {:<20} {}", marker, source.key, source.path.display())?;
    }
    Ok(())
}

/// Print whatever the evaluator should be looking at now
pub fn print_state(out: &mut impl Write, annotator: &Annotator) -> io::Result<()> {
    match (annotator.session(), annotator.phase()) {
        (Some(session), Phase::EmptyOrFailed) => writeln!(
            out,
            "⚠️  No sampled data for '{}'. The file may be empty or failed to load.",
            session.key()
        ),
        (Some(session), Phase::Complete) => {
            writeln!(out, "🎉 Finished evaluating '{}'!", session.key())?;
            writeln!(
                out,
                "Collected {} judgments. Use `export csv` or `export json` to save them.",
                session.judgments().len()
            )
        }
        (Some(session), Phase::Active) => {
            let Some((position, record)) = session.current() else {
                return Ok(());
            };
            writeln!(
                out,
                "Evaluating '{}' ({})",
                session.key(),
                session.path().display()
            )?;
            writeln!(
                out,
                "Item {} / {} (ID: {})",
                position + 1,
                session.sample().len(),
                record.display_id(position)
            )?;
            writeln!(out)?;
            print_block(out, "User A", record.speaker_a_utterance.as_deref())?;
            print_block(out, "Background", record.background_context.as_deref())?;
            print_block(out, "User B", record.speaker_b_response.as_deref())?;
            writeln!(out, "Type `judge` to score this item.")
        }
        (None, _) | (_, Phase::NoFileSelected) => writeln!(
            out,
            "👈 Pick a source to evaluate (`sources` lists them, `select <key>` opens one)."
        ),
    }
}

fn print_block(out: &mut impl Write, title: &str, text: Option<&str>) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    for line in text.unwrap_or("N/A").lines() {
        writeln!(out, "> {}", line)?;
    }
    writeln!(out)
}

/// Print the rubric question being asked
pub fn print_question(out: &mut impl Write, question: &str) -> io::Result<()> {
    writeln!(out, "{}", question)?;
    write!(
        out,
        "score [{}-{}, enter for {}]: ",
        MIN_SCORE, MAX_SCORE, DEFAULT_SCORE
    )?;
    out.flush()
}

/// Print a short confirmation for an action's outcome
pub fn print_outcome(out: &mut impl Write, outcome: &Outcome) -> io::Result<()> {
    match outcome {
        Outcome::Unchanged => Ok(()),
        Outcome::Started { key, sampled } => writeln!(
            out,
            "Starting '{}': {} items sampled.",
            key, sampled
        ),
        Outcome::Cleared => writeln!(out, "Source cleared."),
        Outcome::Advanced { .. } => writeln!(out, "✅ Judgment saved. Moving to the next item."),
        Outcome::Completed { key, judged } => writeln!(
            out,
            "✅ All {} items of '{}' judged!",
            judged, key
        ),
    }
}

/// Echo the scores of the judgment just recorded
pub fn print_last_judgment(out: &mut impl Write, annotator: &Annotator) -> io::Result<()> {
    let Some(judgment) = annotator.session().and_then(|s| s.judgments().last()) else {
        return Ok(());
    };
    let scores: Vec<String> = judgment
        .evaluation_scores
        .entries()
        .iter()
        .map(|(_, score)| score.to_string())
        .collect();
    writeln!(out, "Recorded {}: [{}]", judgment.data_id, scores.join(" "))
}

/// Print how many judgments each source has collected during this run
pub fn print_status(out: &mut impl Write, annotator: &Annotator) -> io::Result<()> {
    writeln!(out, "📊 COLLECTED")?;
    writeln!(out, "------------")?;
    for source in annotator.sources() {
        let loaded = if annotator.loader().is_cached(&source.path) {
            "loaded"
        } else {
            ""
        };
        writeln!(
            out,
            "{:<20} {:>5}  {}",
            source.key,
            annotator.collected(&source.key).len(),
            loaded
        )?;
    }
    if let Some(session) = annotator.session() {
        writeln!(
            out,
            "Active: '{}' ({} / {} judged this pass)",
            session.key(),
            session.cursor(),
            session.sample().len()
        )?;
    }
    Ok(())
}
