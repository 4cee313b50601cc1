//! `ventaly status`: one-shot status read.

use ventaly_config::Config;

use crate::cli::{GlobalOpts, Section, StatusArgs};
use crate::commands::util::{self, StatusView};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &StatusArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let target = config::resolve_target(global, cfg)?;
    let format = config::output_format(global, cfg);
    let color = output::should_color(global.color);

    let (device, snapshot) = util::connect(&target).await?;

    let out = if let Some(section) = args.section {
        let payload = match section {
            Section::Header => &snapshot.header,
            Section::Action => &snapshot.action,
            Section::Info => &snapshot.info,
            Section::Measure => &snapshot.measure,
        };
        output::render_single(
            format,
            payload,
            |p| {
                p.iter()
                    .map(|(k, v)| format!("{k:<16} {}", output::scalar(v)))
                    .collect::<Vec<_>>()
                    .join("\n")
            },
            |p| {
                p.iter()
                    .map(|(k, v)| format!("{k}={}", output::scalar(v)))
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        )?
    } else {
        let view = StatusView::new(util::identity(&device)?, &snapshot, args.maintenance);
        output::render_single(
            format,
            &view,
            |v| util::status_detail(v, color),
            |v| util::status_plain(v.snapshot),
        )?
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
