use super::*;

#[test]
fn parses_search_with_defaults() {
    let cli = Cli::try_parse_from(["storescout-cli", "search", "Doom"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Search {
            query,
            region,
            all,
            no_sort,
            enrich,
        } => {
            assert_eq!(query, "Doom");
            assert_eq!(region, DEFAULT_REGION);
            assert!(!all && !no_sort && !enrich);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn search_flags_invert_into_options() {
    let cli = Cli::try_parse_from([
        "storescout-cli",
        "search",
        "Doom",
        "--region",
        "BE",
        "--all",
        "--no-sort",
    ])
    .expect("expected valid cli args");

    let Commands::Search {
        region,
        all,
        no_sort,
        enrich,
        ..
    } = cli.command
    else {
        panic!("expected search command");
    };
    assert_eq!(region, "BE");

    let options = commands::search_options(all, no_sort, enrich);
    assert!(!options.filter_dlc);
    assert!(!options.sort_by_relevance);
    assert!(!options.enrich);
}

#[test]
fn parses_match_targets_as_list() {
    let cli = Cli::try_parse_from([
        "storescout-cli",
        "match",
        "EP1003-CUSA02092_00-DOOMTHEGAME00000",
        "--region",
        "BE",
        "--targets",
        "US,GB",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Match { ref targets, .. } if targets == &["US", "GB"]
    ));
}

#[test]
fn match_without_targets_is_empty() {
    let cli = Cli::try_parse_from(["storescout-cli", "match", "EP1003-CUSA02092_00-DOOM"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Match { ref targets, .. } if targets.is_empty()
    ));
}

#[test]
fn parses_rates_refresh_flag() {
    let cli = Cli::try_parse_from(["storescout-cli", "rates", "--refresh"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Rates { refresh: true }));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["storescout-cli"]).is_err());
}
