use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use rgph::format::format_value;
use rgph::models::{IndicatorParams, MapDataParams, RegionParams};
use rgph::preference::LanguagePreference;
use rgph::store::map::GeoStatus;
use rgph::{AdminLevel, ApiResponse, Client, Config, Language, MapStore, ThemeStore, stats, storage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rgph",
    version,
    about = "Query RGPH 2024 census data: regions, themes, indicators and map values"
)]
struct Cli {
    /// Census API base URL.
    #[arg(long, global = true, env = "RGPH_API_BASE")]
    api_base: Option<String>,
    /// Display language (fr, ar, en). Defaults to the saved preference, then RGPH_LANG / LANG.
    #[arg(long, global = true)]
    lang: Option<Language>,
    /// Print the raw JSON response instead of a table.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List regions (optionally one level or the children of a parent).
    Regions {
        #[arg(long)]
        level: Option<AdminLevel>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show one region, its children, or its indicators.
    Region {
        code: String,
        #[arg(long, default_value_t = false)]
        children: bool,
        #[arg(long, default_value_t = false)]
        indicators: bool,
    },
    /// List themes (built-in list unless --remote).
    Themes {
        /// Refresh the list from the API.
        #[arg(long, default_value_t = false)]
        remote: bool,
    },
    /// Show one theme or its key figures.
    Theme {
        slug: String,
        #[arg(long, default_value_t = false)]
        key_figures: bool,
    },
    /// List indicators, optionally by theme or search term.
    Indicators {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Load an indicator's map values (and optionally save, colour, and summarize them).
    Map(MapArgs),
    /// Chart rows for an indicator.
    Chart {
        indicator: String,
        /// Extra query parameters as key=value (repeatable).
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Compare an indicator across regions.
    Compare {
        indicator: String,
        /// Region codes separated by comma or semicolon (e.g., DJ-AR,DJ-OB)
        #[arg(short, long)]
        regions: String,
    },
    /// Fetch GeoJSON geometry for an admin level.
    Geo {
        #[arg(default_value = "region")]
        level: AdminLevel,
        /// Save the geometry to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Search regions, indicators and themes.
    Search { query: String },
    /// Show or save the preferred display language.
    Lang {
        value: Option<Language>,
        /// Forget the saved preference.
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct MapArgs {
    indicator: String,
    #[arg(long)]
    level: Option<AdminLevel>,
    /// Print summary statistics.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Print the choropleth fill colour of each row.
    #[arg(long, default_value_t = false)]
    colors: bool,
    /// Use the bundled region values if the API request fails.
    #[arg(long, default_value_t = false)]
    fallback: bool,
    /// Save rows to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

struct Ctx {
    client: Client,
    lang: Language,
    json: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Print the envelope as JSON, or unwrap it and hand the data to `table`.
fn show<T: Serialize>(ctx: &Ctx, resp: ApiResponse<T>, table: impl FnOnce(&T, Language)) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        return Ok(());
    }
    let data = resp.into_result()?;
    table(&data, ctx.lang);
    Ok(())
}

fn resolve_language(flag: Option<Language>, config: &Config) -> Language {
    flag.or_else(|| LanguagePreference::user().ok().and_then(|p| p.load()))
        .unwrap_or(config.language)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Command::Lang { value, clear } = &cli.cmd {
        return cmd_lang(*value, *clear);
    }

    let mut config = Config::from_env();
    if let Some(base) = cli.api_base {
        config.api_base = base;
    }
    let ctx = Ctx {
        client: Client::from_config(&config).context("configure census api client")?,
        lang: resolve_language(cli.lang, &config),
        json: cli.json,
    };

    match cli.cmd {
        Command::Regions { level, parent } => {
            let params = RegionParams {
                level,
                parent_code: parent,
            };
            show(&ctx, ctx.client.regions(&params)?, |regions, lang| {
                for r in regions {
                    println!(
                        "{:<10} {:<28} {:<9} pop={}",
                        r.code,
                        r.display_name(lang),
                        r.level,
                        format_value(r.population, lang)
                    );
                }
            })
        }
        Command::Region {
            code,
            children,
            indicators,
        } => {
            if children {
                show(&ctx, ctx.client.region_children(&code)?, |regions, lang| {
                    for r in regions {
                        println!("{:<10} {}", r.code, r.display_name(lang));
                    }
                })
            } else if indicators {
                let resp = ctx.client.region_indicators(&code, &IndicatorParams::default())?;
                show(&ctx, resp, |list, lang| {
                    for i in list {
                        println!("{:<16} {}", i.code, i.display_name(lang));
                    }
                })
            } else {
                show(&ctx, ctx.client.region(&code)?, |r, lang| {
                    println!("{} • {} ({})", r.code, r.display_name(lang), r.level);
                    println!("  population: {}", format_value(r.population, lang));
                    println!("  area:       {}", format_value(r.area, lang));
                    if let Some(p) = &r.parent_code {
                        println!("  parent:     {}", p);
                    }
                })
            }
        }
        Command::Themes { remote } => cmd_themes(&ctx, remote),
        Command::Theme { slug, key_figures } => {
            if key_figures {
                show(&ctx, ctx.client.theme_key_figures(&slug)?, |figures, _| {
                    for f in figures {
                        println!("{}", f);
                    }
                })
            } else {
                show(&ctx, ctx.client.theme(&slug)?, |t, lang| {
                    println!("{} • {}", t.slug, t.display_name(lang));
                    let desc = t.display_description(lang);
                    if !desc.is_empty() {
                        println!("  {}", desc);
                    }
                })
            }
        }
        Command::Indicators {
            theme,
            search,
            limit,
        } => {
            let params = IndicatorParams {
                theme_slug: None,
                search,
                limit,
            };
            let resp = match theme {
                Some(slug) => ctx.client.indicators_by_theme(&slug, &params)?,
                None => ctx.client.indicators(&params)?,
            };
            show(&ctx, resp, |list, lang| {
                for i in list {
                    println!(
                        "{:<16} {:<24} {} {}",
                        i.code,
                        i.theme_slug,
                        i.display_name(lang),
                        i.unit.as_deref().map(|u| format!("[{u}]")).unwrap_or_default()
                    );
                }
            })
        }
        Command::Map(args) => cmd_map(&ctx, args),
        Command::Chart { indicator, params } => {
            let params: BTreeMap<String, String> = params.into_iter().collect();
            show(&ctx, ctx.client.chart_data(&indicator, &params)?, |rows, lang| {
                for r in rows {
                    let pct = r
                        .percentage
                        .map(|p| format!(" ({}%)", format_value(Some(p), lang)))
                        .unwrap_or_default();
                    println!("{:<28} {}{}", r.label, format_value(Some(r.value), lang), pct);
                }
            })
        }
        Command::Compare { indicator, regions } => {
            let regions = parse_list(&regions);
            let resp = ctx.client.compare(&indicator, &regions)?;
            show(&ctx, resp, |data, _| {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            })
        }
        Command::Geo { level, out } => cmd_geo(&ctx, level, out),
        Command::Search { query } => show(&ctx, ctx.client.search(&query, ctx.lang)?, |hits, lang| {
            for h in hits {
                println!("{:<10} {:<16} {}", h.kind, h.key(), h.display_name(lang));
            }
        }),
        Command::Lang { .. } => Ok(()),
    }
}

fn cmd_lang(value: Option<Language>, clear: bool) -> Result<()> {
    let pref = LanguagePreference::user()?;
    if clear {
        pref.clear()?;
        eprintln!("Cleared language preference at {}", pref.path().display());
    } else if let Some(lang) = value {
        pref.save(lang)?;
        eprintln!("Saved language {} to {}", lang, pref.path().display());
    } else {
        let current = resolve_language(None, &Config::from_env());
        println!("{}", current);
    }
    Ok(())
}

fn cmd_themes(ctx: &Ctx, remote: bool) -> Result<()> {
    let store = ThemeStore::new(&ctx.client);
    if remote {
        if let Err(e) = store.refresh() {
            warn!("keeping built-in themes: {}", e);
            eprintln!("Could not refresh themes ({e}); showing built-in list");
        }
    }
    let themes = store.themes();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&themes)?);
        return Ok(());
    }
    for t in themes {
        println!(
            "{:<30} {:<34} {:<18} {}",
            t.slug,
            t.display_name(ctx.lang),
            t.icon.as_deref().unwrap_or("-"),
            t.color.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_map(ctx: &Ctx, args: MapArgs) -> Result<()> {
    let store = MapStore::new(&ctx.client);
    if let Some(level) = args.level {
        store.set_level(level);
    }
    if let Err(e) = store.load_map_data(&args.indicator, &MapDataParams::default()) {
        if !args.fallback {
            return Err(e).with_context(|| format!("load map data for {}", args.indicator));
        }
        eprintln!("{} ({e}); using bundled region values", rgph::store::map::MAP_DATA_ERROR);
        store.load_fallback_map_data(&args.indicator);
    }
    let rows = store.map_data();

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&rows, ctx.lang, path)?,
            "json" => storage::save_json(&rows, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", rows.len(), path.display());
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let fills: BTreeMap<String, Option<String>> = if args.colors {
            store.fill_colors().into_iter().collect()
        } else {
            BTreeMap::new()
        };
        for r in &rows {
            let fill = match fills.get(r.unit_code()) {
                Some(Some(hex)) => hex.clone(),
                Some(None) => "no-data".to_string(),
                None => String::new(),
            };
            println!(
                "{:<10} {:<28} {:>14} {}",
                r.unit_code(),
                r.display_name(ctx.lang),
                format_value(r.value, ctx.lang),
                fill
            );
        }
    }

    if args.stats {
        let s = stats::summarize(&rows);
        println!(
            "count={} missing={}  min={} max={} mean={} median={}",
            s.count,
            s.missing,
            format_value(s.min, ctx.lang),
            format_value(s.max, ctx.lang),
            format_value(s.mean, ctx.lang),
            format_value(s.median, ctx.lang)
        );
    }
    Ok(())
}

fn cmd_geo(ctx: &Ctx, level: AdminLevel, out: Option<PathBuf>) -> Result<()> {
    let store = MapStore::new(&ctx.client);
    let geo = store
        .fetch_geojson(level)
        .with_context(|| format!("load {} geometry", level))?;
    if store.geo_status(level) == GeoStatus::Fallback {
        eprintln!("Using bundled {} geometry (API unavailable)", level);
    }
    if let Some(path) = out.as_ref() {
        std::fs::write(path, serde_json::to_string(geo.as_ref())?)
            .with_context(|| format!("write {}", path.display()))?;
        eprintln!("Wrote {} geometry to {}", level, path.display());
    }
    if ctx.json && out.is_none() {
        println!("{}", serde_json::to_string_pretty(geo.as_ref())?);
    } else {
        println!("{} features at {} level", geo.feature_count(), level);
    }
    Ok(())
}
