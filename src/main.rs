use anyhow::Result;
use clap::{Parser as ClapParser, ValueEnum};
use log::debug;
use padding::catalog::Catalog;
use padding::report::{self, Options};
use padding::target::Target;

fn parse_target(s: &str) -> Result<Target, &'static str> {
    Target::from_name(s).ok_or("Invalid target, expected one of: x86_64, i686, arm")
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Ron,
}

#[derive(ClapParser, Debug)]
struct Args {
    /// Lay structures out for this target instead of the host.
    #[arg(short, long, value_parser = parse_target)]
    target: Option<Target>,

    #[arg(long, default_value_t = false)]
    all_fields: bool,

    #[arg(long, default_value_t = false)]
    hide_addresses: bool,

    #[arg(long, default_value_t = false)]
    compare_targets: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_builder = env_logger::builder();
    if args.verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    } else {
        log_builder.filter_level(log::LevelFilter::Info);
    }
    log_builder.init();
    debug!("arguments: {args:#?}");

    let Args {
        target,
        all_fields,
        hide_addresses,
        compare_targets,
        format,
        verbose: _,
    } = args;

    let target = target.unwrap_or_else(Target::host);
    let catalog = Catalog::standard()?;

    let output = match format {
        Format::Text => report::render(
            &catalog,
            &Options {
                target,
                all_fields,
                show_addresses: !hide_addresses,
                compare_targets,
            },
        )?,
        Format::Ron => report::render_ron(&catalog, &target)?,
    };

    print!("{}", output);

    Ok(())
}
