use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use services::sessions::Advance;
use services::{PracticeLoopService, PracticeRun, SessionPhase};
use tutor_core::model::{AnswerType, FlagType, Question, SessionSummary};

/// One line of learner input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Hint,
    Solution,
    Flag(FlagType, Option<String>),
    Progress,
    Quit,
    Help,
    Answer(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Answer(line));
        };
        let (name, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, args)| (name, args.trim()));
        match name {
            "hint" => Ok(Command::Hint),
            "solution" => Ok(Command::Solution),
            "progress" => Ok(Command::Progress),
            "quit" | "q" => Ok(Command::Quit),
            "help" => Ok(Command::Help),
            "flag" => {
                let (kind, comment) = args
                    .split_once(char::is_whitespace)
                    .map_or((args, ""), |(kind, comment)| (kind, comment.trim()));
                let flag_type = kind.parse::<FlagType>().map_err(|_| {
                    let known: Vec<_> = FlagType::ALL.iter().map(|f| f.as_str()).collect();
                    format!("flag type must be one of: {}", known.join(", "))
                })?;
                let comment = (!comment.is_empty()).then(|| comment.to_owned());
                Ok(Command::Flag(flag_type, comment))
            }
            other => Err(format!("unknown command :{other} (try :help)")),
        }
    }
}

const HELP: &str = "\
Type an answer and press enter. Multiple choice takes the option number.
  :hint               reveal the next hint
  :solution           show the worked solution (after answering)
  :flag TYPE [NOTE]   report a problem with this question
  :progress           show session progress
  :quit               abandon the session";

/// Drive `run` from `input` until it completes.
///
/// Returns `None` if the learner quits or input ends first.
pub async fn drive<R, W>(
    service: &PracticeLoopService,
    run: &mut PracticeRun,
    input: R,
    out: &mut W,
) -> anyhow::Result<Option<SessionSummary>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    present(run, out)?;

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        match command {
            Command::Quit => return Ok(None),
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Progress => {
                let progress = run.session().progress();
                writeln!(
                    out,
                    "{}/{} answered, {} correct, streak {}",
                    progress.answered, progress.total, progress.correct, progress.streak
                )?;
            }
            Command::Hint => match run.session_mut().reveal_hint() {
                Ok((index, hint)) => writeln!(out, "Hint {}: {hint}", index + 1)?,
                Err(err) => writeln!(out, "{err}")?,
            },
            Command::Solution => match run.session_mut().reveal_solution() {
                Ok([]) => writeln!(out, "No worked solution for this question.")?,
                Ok(steps) => {
                    for (n, step) in steps.iter().enumerate() {
                        writeln!(out, "  {}. {step}", n + 1)?;
                    }
                }
                Err(err) => writeln!(out, "{err}")?,
            },
            Command::Flag(flag_type, comment) => match service.flag(run, flag_type, comment) {
                Ok(record) => writeln!(out, "Thanks, reported as {}.", record.flag_type)?,
                Err(err) => writeln!(out, "{err}")?,
            },
            Command::Answer(text) if run.session().phase() == SessionPhase::Submitted => {
                if !text.is_empty() {
                    writeln!(out, "Already answered; press enter to continue.")?;
                    continue;
                }
                match service.next(run)? {
                    Advance::Next { .. } => present(run, out)?,
                    Advance::Completed(summary) => return Ok(Some(summary)),
                }
            }
            Command::Answer(text) => answer(service, run, text, out)?,
        }
    }

    Ok(None)
}

fn answer<W: Write>(
    service: &PracticeLoopService,
    run: &mut PracticeRun,
    text: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let is_choice = run
        .session()
        .current_question()
        .is_some_and(|q| q.answer_type() == AnswerType::MultipleChoice);

    let entered = if is_choice {
        match text.parse::<usize>() {
            Ok(n) if n >= 1 => run.session_mut().select_choice(n - 1),
            _ => {
                writeln!(out, "Enter the number of an option.")?;
                return Ok(());
            }
        }
    } else {
        run.session_mut().set_answer_text(text)
    };
    if let Err(err) = entered {
        writeln!(out, "{err}")?;
        return Ok(());
    }

    match service.submit(run) {
        Ok(outcome) if outcome.validation.is_correct => {
            writeln!(out, "Correct! (streak {})", outcome.stats.streak)?;
        }
        Ok(_) => writeln!(out, "Not quite. Try :solution, or press enter to continue.")?,
        Err(err) => writeln!(out, "{err}")?,
    }
    Ok(())
}

fn present<W: Write>(run: &PracticeRun, out: &mut W) -> anyhow::Result<()> {
    let session = run.session();
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let progress = session.progress();
    writeln!(
        out,
        "\n[{}/{}] {}",
        progress.position(),
        progress.total,
        question.prompt()
    )?;
    write_choices(question, out)?;
    Ok(())
}

fn write_choices<W: Write>(question: &Question, out: &mut W) -> std::io::Result<()> {
    for (n, choice) in question.answer().choices().iter().enumerate() {
        writeln!(out, "  {}) {choice}", n + 1)?;
    }
    Ok(())
}

pub fn write_summary<W: Write>(summary: &SessionSummary, out: &mut W) -> std::io::Result<()> {
    let minutes = (summary.completed_at() - summary.started_at()).num_minutes();
    writeln!(
        out,
        "\nSession complete: {}/{} correct ({}%), best streak {}, {} min.",
        summary.correct(),
        summary.total(),
        summary.score_percent(),
        summary.best_streak(),
        minutes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::SessionStart;
    use storage::{InMemoryRepository, Storage};
    use tutor_core::Clock;
    use tutor_core::model::{AnswerSpec, PracticeMode, QuestionId, TopicId};
    use tutor_core::time::fixed_now;

    fn service(questions: Vec<Question>) -> (InMemoryRepository, PracticeLoopService) {
        let repo = InMemoryRepository::new();
        for question in questions {
            repo.upsert_question(question).unwrap();
        }
        let service = PracticeLoopService::new(Clock::fixed(fixed_now()), Storage::from_memory(&repo))
            .with_seed(1);
        (repo, service)
    }

    async fn started(service: &PracticeLoopService) -> PracticeRun {
        match service
            .start_session(PracticeMode::Topic(TopicId::new(1)), None)
            .await
            .unwrap()
        {
            SessionStart::Ready(run) => run,
            SessionStart::Nothing(reason) => panic!("{reason}"),
        }
    }

    fn question(id: u64, answer: AnswerSpec) -> Question {
        Question::new(QuestionId::new(id), TopicId::new(1), format!("Q{id}"), answer, 1)
            .unwrap()
            .with_hints(["think about it"])
            .with_solution_steps(["do the thing"])
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  42 "), Ok(Command::Answer("42")));
        assert_eq!(Command::parse(":hint"), Ok(Command::Hint));
        assert_eq!(
            Command::parse(":flag typo  missing sign "),
            Ok(Command::Flag(FlagType::Typo, Some("missing sign".into())))
        );
        assert_eq!(
            Command::parse(":flag too_hard"),
            Ok(Command::Flag(FlagType::TooHard, None))
        );
        assert!(Command::parse(":flag nonsense").is_err());
        assert!(Command::parse(":dance").is_err());
    }

    #[tokio::test]
    async fn completes_a_session_from_scripted_input() {
        let (repo, service) = service(vec![
            question(1, AnswerSpec::numeric(4.0, None)),
            question(2, AnswerSpec::exact("4")),
        ]);
        let mut run = started(&service).await;
        let mut out = Vec::new();

        let script: &[u8] = b":hint\n:hint\n4\n:solution\n\n4\n\n";
        let summary = drive(&service, &mut run, script, &mut out)
            .await
            .unwrap()
            .unwrap();
        run.flush().await;

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.correct(), 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[1/2] Q"));
        assert!(text.contains("[2/2] Q"));
        assert!(!text.contains("[3/2]"));
        assert!(text.contains("Hint 1: think about it"));
        assert!(text.contains("all hints have already been revealed"));
        assert!(text.contains("1. do the thing"));
        let attempts = repo.recorded_attempts().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].1.hints_used, 1);
    }

    #[tokio::test]
    async fn progress_reports_answered_and_streak() {
        let (_repo, service) = service(vec![
            question(1, AnswerSpec::exact("a")),
            question(2, AnswerSpec::exact("b")),
        ]);
        let mut run = started(&service).await;
        let mut out = Vec::new();

        let script: &[u8] = b":progress\na\n:progress\n\n:quit\n";
        drive(&service, &mut run, script, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0/2 answered, 0 correct, streak 0"));
        assert!(text.contains("1/2 answered, 1 correct, streak 1"));
        assert!(text.contains("[2/2] Q"));
    }

    #[tokio::test]
    async fn multiple_choice_takes_option_numbers() {
        let (_repo, service) = service(vec![question(
            1,
            AnswerSpec::multiple_choice(["red", "blue"], 1),
        )]);
        let mut run = started(&service).await;
        let mut out = Vec::new();

        let script: &[u8] = b"blue\n0\n2\n\n";
        let summary = drive(&service, &mut run, script, &mut out)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.correct(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  2) blue"));
        assert!(text.contains("Enter the number of an option."));
    }

    #[tokio::test]
    async fn quitting_abandons_the_session() {
        let (repo, service) = service(vec![question(1, AnswerSpec::exact("x"))]);
        let mut run = started(&service).await;
        let mut out = Vec::new();

        let script: &[u8] = b":flag unclear what is x\n:quit\n";
        let summary = drive(&service, &mut run, script, &mut out).await.unwrap();
        run.flush().await;

        assert!(summary.is_none());
        let flags = repo.recorded_flags().unwrap();
        assert_eq!(flags[0].comment.as_deref(), Some("what is x"));
    }
}
