pub mod cli;
pub mod collection;
pub mod cyoa;
pub mod data;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod io_utils;
pub mod mapping;
pub mod normalize;
pub mod sampler;
pub mod snapshot;
pub mod state;
pub mod table;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    cli::{Cli, Commands},
    decode::{DecodeOptions, InputFormat},
    snapshot::Snapshot,
    state::AppState,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("table_roller", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let state_path = cli.state.as_path();
    match cli.command {
        Commands::Load(args) => handle_load(state_path, &args),
        Commands::Predefined => {
            print!("{}", predefined_listing());
            Ok(())
        }
        Commands::Groups => {
            print!("{}", table::group_listing(&load_state(state_path)?));
            Ok(())
        }
        Commands::Select(args) => handle_select(state_path, &args),
        Commands::RenameGroup(args) => {
            let state = load_state(state_path)?.rename_group(&args.group, &args.label)?;
            save_state(state_path, &state)
        }
        Commands::Fields => {
            print!("{}", table::field_listing(&load_state(state_path)?));
            Ok(())
        }
        Commands::Map(args) => handle_map(state_path, &args),
        Commands::Hide(args) => {
            let state = args
                .fields
                .iter()
                .fold(load_state(state_path)?, |state, field| {
                    state.set_hidden(field, !args.show)
                });
            save_state(state_path, &state)
        }
        Commands::Roll(args) => handle_roll(state_path, &args),
        Commands::Kept => {
            print!("{}", table::kept_listing(&load_state(state_path)?));
            Ok(())
        }
        Commands::Remove(args) => {
            let state = load_state(state_path)?.remove_kept(&args.id)?;
            info!("Removed kept item '{}'", args.id);
            save_state(state_path, &state)
        }
        Commands::Show(args) => handle_show(state_path, &args),
    }
}

fn load_state(path: &Path) -> Result<AppState> {
    if !path.exists() {
        bail!("No state file at {path:?}; run `load` first");
    }
    let snapshot =
        Snapshot::load(path).with_context(|| format!("Reading state from {path:?}"))?;
    snapshot
        .import()
        .with_context(|| format!("Restoring state from {path:?}"))
}

fn save_state(path: &Path, state: &AppState) -> Result<()> {
    Snapshot::export(state)
        .save(path)
        .with_context(|| format!("Writing state to {path:?}"))
}

fn handle_load(state_path: &Path, args: &cli::LoadArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let (bytes, origin, inferred) = match (&args.input, &args.url, &args.predefined) {
        (Some(path), _, _) => {
            let bytes = io_utils::read_payload(path)?;
            (bytes, path.clone(), infer_format(path))
        }
        (None, Some(url), _) => {
            let bytes = fetch::fetch_bytes(url)?;
            let origin = PathBuf::from(url.split('?').next().unwrap_or(url));
            let inferred = infer_format(&origin);
            (bytes, origin, inferred)
        }
        (None, None, Some(key)) => {
            let document = fetch::find_predefined(key)
                .ok_or_else(|| anyhow!("Unknown predefined document '{key}'"))?;
            info!("Loading predefined document '{}'", document.name);
            let bytes = fetch::fetch_bytes(document.url)?;
            (bytes, PathBuf::from(document.url), Some(document.format))
        }
        (None, None, None) => bail!("Provide --input, --url, or --predefined"),
    };

    let options = DecodeOptions {
        format: args
            .format
            .or(inferred)
            .unwrap_or(InputFormat::Workbook),
        table_name: args.table_name.clone().unwrap_or_else(|| {
            origin
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty() && *stem != "-")
                .unwrap_or("Sheet1")
                .to_string()
        }),
        delimiter: io_utils::resolve_input_delimiter(&origin, args.delimiter),
        encoding,
    };
    info!(
        "Decoding {:?} as {:?} (delimiter '{}', encoding {})",
        origin,
        options.format,
        printable_delimiter(options.delimiter),
        encoding.name()
    );
    let groups = decode::decode_groups(&bytes, &options)
        .with_context(|| format!("Decoding {origin:?}"))?;
    if groups.is_empty() {
        warn!("No groups found in {origin:?}");
    }

    let mut state = AppState::from_groups(groups);
    if args.select_all {
        state = state.toggle_all();
    }
    save_state(state_path, &state)
}

fn infer_format(path: &Path) -> Option<InputFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv") => {
            Some(InputFormat::Csv)
        }
        _ => None,
    }
}

fn handle_select(state_path: &Path, args: &cli::SelectArgs) -> Result<()> {
    let state = load_state(state_path)?;
    let state = if args.all {
        state.toggle_all()
    } else {
        args.groups
            .iter()
            .try_fold(state, |state, group| state.select(group, !args.off))?
    };
    info!(
        "{} of {} group(s) selected, {} record(s) in the pool",
        state.selected().len(),
        state.groups().len(),
        state.pool().len()
    );
    save_state(state_path, &state)
}

fn handle_map(state_path: &Path, args: &cli::MapArgs) -> Result<()> {
    if args.field == data::ID_FIELD {
        bail!("The '{}' field cannot be renamed", data::ID_FIELD);
    }
    let state = load_state(state_path)?;
    if !state.source_fields().contains(&args.field) {
        warn!(
            "Field '{}' does not appear in the selected groups",
            args.field
        );
    }
    let state = state.set_mapping(&args.field, &args.target, args.order);
    info!(
        "Mapped '{}' to '{}'",
        args.field,
        state.mapping().target(&args.field)
    );
    save_state(state_path, &state)
}

fn handle_roll(state_path: &Path, args: &cli::RollArgs) -> Result<()> {
    let mut state = load_state(state_path)?;
    let parsed = filter::parse_filters(&args.filters)?;
    let specs = if !parsed.is_empty() || args.no_saved_filters {
        parsed.clone()
    } else {
        state.filters().to_vec()
    };
    debug!("Filters: {specs:?}");

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let results = state.roll(&specs, &args.only_groups, args.count, &mut rng);
    info!("Rolled {} result(s)", results.len());
    print!("{}", table::roll_listing(&state, &results));

    let mut changed = false;
    if args.keep {
        state = results
            .into_iter()
            .fold(state, |state, result| state.keep(result));
        changed = true;
    }
    if args.save_filters {
        state = state.set_filters(parsed);
        changed = true;
    }
    if changed {
        save_state(state_path, &state)?;
    }
    Ok(())
}

fn handle_show(state_path: &Path, args: &cli::ShowArgs) -> Result<()> {
    let state = load_state(state_path)?;
    let items = match &args.id {
        Some(id) => vec![
            state
                .kept()
                .find(id)
                .ok_or_else(|| error::StateError::UnknownItem(id.clone()))?,
        ],
        None => state.kept().items().iter().collect(),
    };
    let text = items
        .into_iter()
        .map(|item| state.render_text(item))
        .collect::<Vec<_>>()
        .join("\n");
    io_utils::write_text(args.output.as_deref(), &text)
}

fn predefined_listing() -> String {
    let rows = fetch::PREDEFINED_DOCUMENTS
        .iter()
        .enumerate()
        .map(|(idx, doc)| {
            vec![
                (idx + 1).to_string(),
                doc.name.to_string(),
                doc.description.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::render_grid(&["#", "Name", "Description"], &rows)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
