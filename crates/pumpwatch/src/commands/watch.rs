//! Live watch: runs the monitor's background tasks and re-renders the
//! selected view each time it changes, until interrupted.

use std::sync::Arc;

use tracing::{debug, info};

use pumpwatch_core::{Monitor, MonitorConfig, StationView};

use crate::cli::{GlobalOpts, WatchArgs, WatchView};
use crate::error::CliError;
use crate::output;

use super::{dispensers, fuelings, nozzles};

pub async fn handle(
    mut config: MonitorConfig,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.no_push {
        config.push_enabled = false;
    }
    let monitor = Monitor::connect(config)?;
    monitor.start().await?;

    let result = run(&monitor, args, global).await;
    monitor.stop().await;
    result
}

async fn run(monitor: &Monitor, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut views = monitor.subscribe();
    let mut push_state = monitor.push_state();
    let mut shown: Option<Arc<StationView>> = None;
    let mut rendered = 0usize;

    let mut next = Some(Arc::clone(views.current()));
    loop {
        if let Some(view) = next.take() {
            let changed = shown
                .as_deref()
                .is_none_or(|prev| !same_section(prev, &view, args.view));
            if changed {
                output::print_output(&render(&view, args.view, global)?, global.quiet);
                shown = Some(view);
                rendered += 1;
                if args.count.is_some_and(|limit| rendered >= limit) {
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            Ok(()) = push_state.changed() => {
                let state = *push_state.borrow_and_update();
                debug!(?state, "push connection state changed");
            }
            view = views.changed() => match view {
                Some(view) => next = Some(view),
                None => break,
            },
        }
    }
    Ok(())
}

/// Recomputations fire on every poll; only re-render when the selected
/// section actually differs.
fn same_section(a: &StationView, b: &StationView, view: WatchView) -> bool {
    match view {
        WatchView::Dispensers => a.dispensers == b.dispensers,
        WatchView::Nozzles => a.nozzles == b.nozzles,
        WatchView::Fuelings => a.fuelings == b.fuelings,
    }
}

fn render(view: &StationView, which: WatchView, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    let body = match which {
        WatchView::Dispensers => output::render_list(
            &global.output,
            &view.dispensers,
            |d| dispensers::DispenserRow::new(d, color),
            dispensers::line,
        )?,
        WatchView::Nozzles => output::render_list(
            &global.output,
            &view.nozzles,
            |n| nozzles::NozzleRow::new(n, color),
            nozzles::line,
        )?,
        WatchView::Fuelings => output::render_list(
            &global.output,
            &view.fuelings,
            |f| fuelings::FuelingRow::from(f),
            fuelings::line,
        )?,
    };

    // Structured formats stream one document per update; tables get a timestamp.
    Ok(match (&global.output, view.generated_at) {
        (crate::cli::OutputFormat::Table, Some(at)) => {
            format!("{}\n{body}", at.format("%Y-%m-%d %H:%M:%S UTC"))
        }
        _ => body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_alone_is_not_a_change() {
        let a = StationView::default();
        let b = StationView {
            generated_at: Some(chrono::Utc::now()),
            ..StationView::default()
        };
        assert!(same_section(&a, &b, WatchView::Dispensers));
        assert!(same_section(&a, &b, WatchView::Fuelings));
    }
}
