//! Sync command: fetch the timetable and publish the calendar.

use std::io::Write;

use chrono::Utc;
use tracing::{info, warn};
use untiscal_providers::LessonSource;
use untiscal_providers::webuntis::WebUntisSource;

use crate::cli::SyncArgs;
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::publish::publish;
use crate::sync::{RawInput, SyncPlan, build_calendar};

/// Runs one sync.
///
/// "Today" is taken in the school's timezone so that the window does not
/// shift for runners in another zone.
pub async fn run(args: &SyncArgs, config: &Config) -> SyncResult<()> {
    let today = Utc::now().with_timezone(&config.timezone()?).date_naive();
    let plan = SyncPlan::from_config(config, today)?;

    info!(
        %today,
        window = %plan.window,
        switch_date = %plan.policy.switch_date,
        switches = plan.policy.switches(),
        "Starting sync"
    );

    let source: Box<dyn LessonSource> = match args.raw_input {
        Some(ref path) => {
            info!(path = %path.display(), "Reading raw lessons from file");
            Box::new(RawInput::load(path)?.into_source(&plan.policy))
        }
        None => Box::new(WebUntisSource::new(config.webuntis_config()?)?),
    };

    let result = build_calendar(source.as_ref(), &plan).await;
    if let Err(e) = source.close().await {
        warn!(error = %e, "Failed to close source session");
    }
    let calendar = result?;

    if args.dry_run {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(calendar.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| SyncError::io("<stdout>", e))?;
        return Ok(());
    }

    let output = args.output.as_ref().unwrap_or(&config.calendar.output);
    publish(output, &calendar)
}
