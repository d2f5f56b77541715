use anyhow::Result;
use git_score::cli;
use git_score::config::{AppConfig, ConnectionClass};
use git_score::report::{Mailer, SmtpMailer};
use lettre::Message;
use std::cell::RefCell;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

/// Records messages instead of delivering them
#[derive(Default)]
struct RecordingMailer {
    sent: RefCell<Vec<Message>>,
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &Message) -> Result<()> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}

impl RecordingMailer {
    fn bodies(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.formatted()).into_owned())
            .collect()
    }
}

struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _message: &Message) -> Result<()> {
        anyhow::bail!("SMTP server unavailable")
    }
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Temporary application directory with a config using the shipped template
struct TestEnv {
    _temp_dir: TempDir,
    config: AppConfig,
    data_path: PathBuf,
}

impl TestEnv {
    fn new() -> Result<Self> {
        Self::with_extra("")
    }

    fn with_extra(extra_yaml: &str) -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let yaml = format!(
            r"
data:
  dir: APPLICATION_PATH/var/data
  filename: scores.json
email:
  subject: Commit scores
  sender: git-score@example.com
  to: team@example.com
template:
  dir: {}
{extra_yaml}
",
            manifest_dir().join("templates").display()
        );
        let config = AppConfig::from_yaml_str(&yaml, temp_dir.path())?;
        let data_path = temp_dir.path().join("var/data/scores.json");
        Ok(TestEnv {
            _temp_dir: temp_dir,
            config,
            data_path,
        })
    }

    fn run_with(&self, input: &str, mailer: &RecordingMailer) -> Result<()> {
        cli::run(&self.config, Cursor::new(input), |_| Ok(mailer))?;
        Ok(())
    }

    fn saved(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.data_path)?)
    }
}

#[test]
fn test_scores_are_saved_and_mailed() -> Result<()> {
    let env = TestEnv::new()?;
    let mailer = RecordingMailer::default();

    env.run_with(
        "a@x.com;ABCDE-fix bug\na@x.com;nope\nb@x.com;FEAT1-add export\n",
        &mailer,
    )?;

    assert_eq!(env.saved()?, r#"{"a@x.com":0,"b@x.com":1}"#);

    let bodies = mailer.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("Subject: Commit scores"));
    assert!(bodies[0].contains("text/html"));
    assert!(bodies[0].contains("<td>b@x.com</td><td>1</td>"));
    assert!(bodies[0].contains("<td>a@x.com</td><td>0</td>"));
    Ok(())
}

#[test]
fn test_scores_accumulate_across_runs() -> Result<()> {
    let env = TestEnv::new()?;
    let mailer = RecordingMailer::default();

    env.run_with("a@x.com;ABCDE-one\n", &mailer)?;
    env.run_with("a@x.com;ABCDE-two\nb@x.com;oops\n", &mailer)?;

    assert_eq!(env.saved()?, r#"{"a@x.com":2,"b@x.com":-1}"#);
    assert_eq!(mailer.bodies().len(), 2);
    Ok(())
}

#[test]
fn test_empty_input_writes_empty_object() -> Result<()> {
    let env = TestEnv::new()?;
    let mailer = RecordingMailer::default();

    env.run_with("", &mailer)?;

    assert_eq!(env.saved()?, "{}");
    assert!(mailer.bodies()[0].contains("0 authors"));
    Ok(())
}

#[test]
fn test_malformed_record_aborts_before_saving() -> Result<()> {
    let env = TestEnv::new()?;
    let mailer = RecordingMailer::default();

    let err = env
        .run_with("a@x.com;ABCDE-ok\nno separator here\n", &mailer)
        .unwrap_err();

    assert!(format!("{err:#}").contains("line 2"));
    assert!(!env.data_path.exists());
    assert!(mailer.bodies().is_empty());
    Ok(())
}

#[test]
fn test_dry_run_prints_report_without_saving() -> Result<()> {
    let env = TestEnv::new()?;
    fs::create_dir_all(env.data_path.parent().unwrap())?;
    fs::write(&env.data_path, r#"{"a@x.com":4}"#)?;
    let mut out = Vec::new();

    let table = cli::dry_run(
        &env.config,
        Cursor::new("a@x.com;ABCDE-one\nb@x.com;nope\n"),
        &mut out,
    )?;

    let printed = String::from_utf8(out)?;
    assert!(printed.contains("<td>a@x.com</td><td>5</td>"));
    assert!(printed.contains("<td>b@x.com</td><td>-1</td>"));
    assert_eq!(table.get("a@x.com"), Some(5));
    assert_eq!(env.saved()?, r#"{"a@x.com":4}"#);
    Ok(())
}

#[test]
fn test_dry_run_does_not_create_score_file() -> Result<()> {
    let env = TestEnv::new()?;
    let mut out = Vec::new();

    cli::dry_run(&env.config, Cursor::new("a@x.com;ABCDE-x\n"), &mut out)?;

    assert!(String::from_utf8(out)?.contains("<td>a@x.com</td><td>1</td>"));
    assert!(!env.data_path.exists());
    assert!(!env.data_path.parent().unwrap().exists());
    Ok(())
}

#[test]
fn test_corrupt_score_file_restarts_from_empty() -> Result<()> {
    let env = TestEnv::new()?;
    let mailer = RecordingMailer::default();
    fs::create_dir_all(env.data_path.parent().unwrap())?;
    fs::write(&env.data_path, "garbage{")?;

    env.run_with("a@x.com;ABCDE-x\n", &mailer)?;

    assert_eq!(env.saved()?, r#"{"a@x.com":1}"#);
    assert_eq!(mailer.bodies().len(), 1);
    Ok(())
}

#[test]
fn test_mail_failure_is_fatal_after_saving() -> Result<()> {
    let env = TestEnv::new()?;

    let result = cli::run(&env.config, Cursor::new("a@x.com;ABCDE-x\n"), |_| {
        Ok(FailingMailer)
    });

    let err = result.unwrap_err();
    assert!(err.to_string().contains("SMTP server unavailable"));
    assert_eq!(env.saved()?, r#"{"a@x.com":1}"#);
    Ok(())
}

#[test]
fn test_missing_smtp_config_fails_at_send_step() -> Result<()> {
    let env = TestEnv::new()?;

    let result = cli::run(&env.config, Cursor::new("a@x.com;ABCDE-x\n"), |config| {
        SmtpMailer::from_options(&config.smtp()?)
    });

    let err = result.unwrap_err();
    assert!(err.to_string().contains("smtp"));
    assert_eq!(env.saved()?, r#"{"a@x.com":1}"#);
    Ok(())
}

#[test]
fn test_custom_score_pattern() -> Result<()> {
    let env = TestEnv::with_extra("score:\n  pattern: '^fix:'\n")?;
    let mailer = RecordingMailer::default();

    env.run_with("a@x.com;fix: typo\na@x.com;ABCDE-x\na@x.com;fix: crash\n", &mailer)?;

    assert_eq!(env.saved()?, r#"{"a@x.com":1}"#);
    Ok(())
}

#[test]
fn test_invalid_score_pattern_is_fatal() -> Result<()> {
    let env = TestEnv::with_extra("score:\n  pattern: '('\n")?;
    let mailer = RecordingMailer::default();

    let err = env.run_with("a@x.com;x\n", &mailer).unwrap_err();

    assert!(err.to_string().contains("score_pattern"));
    assert!(!env.data_path.exists());
    Ok(())
}

#[test]
fn test_example_config_is_valid() -> Result<()> {
    let path = manifest_dir().join("config.example.yml");
    let config = AppConfig::load(&path)?;
    let root = manifest_dir().canonicalize()?;

    assert_eq!(config.data_path()?, root.join("data").join("scores.json"));
    assert_eq!(config.template_dir()?, root.join("templates"));
    assert!(config
        .template_dir()?
        .join(config.template_name()?)
        .exists());

    let smtp = config.smtp()?;
    assert_eq!(smtp.port, 587);
    assert_eq!(smtp.connection_class, ConnectionClass::Login);
    assert_eq!(config.score_pattern()?, None);
    assert_eq!(config.email_to()?, vec!["team@example.com"]);
    Ok(())
}
