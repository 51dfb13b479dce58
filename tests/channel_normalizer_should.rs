use hattrick::channel::{Channel, ResultSet, base_key, normalize_display_name};

#[test]
fn rename_calcio_in_any_case() {
    for raw in ["calcio", "SKY CALCIO", "Sky Sport Calcio HD", "  CaLcIo (backup) "] {
        assert_eq!(normalize_display_name(raw), "Sky Sport Calcio", "{raw}");
    }
}

#[test]
fn first_matching_rule_wins() {
    // "1" belongs to the first rule, so it beats calcio
    assert_eq!(normalize_display_name("Calcio 1"), "Sky Sport Uno");
    // "24" comes before "tennis"
    assert_eq!(normalize_display_name("tennis 24"), "Sky Sport 24");
    // "f1" contains "1", which is checked first
    assert_eq!(normalize_display_name("F1"), "Sky Sport Uno");
    assert_eq!(normalize_display_name("Formula"), "Sky Sport Formula 1");
}

#[test]
fn match_on_substrings() {
    assert_eq!(normalize_display_name("SKYSPORTMAX"), "Sky Sport Max");
    assert_eq!(normalize_display_name("Moto GP live"), "Sky Sport MotoGP");
    assert_eq!(normalize_display_name("DAZN"), "Dazn 1");
}

#[test]
fn keep_unknown_names_trimmed() {
    assert_eq!(normalize_display_name("  Eurosport  "), "Eurosport");
}

#[test]
fn collapse_cosmetic_variants_to_one_key() {
    let plain = base_key("sky sport uno");
    assert_eq!(base_key("Sky Sport Uno HD"), plain);
    assert_eq!(base_key("Sky Sport Uno (backup)"), plain);
    assert_eq!(base_key("Sky Sport Uno(backup)"), plain);
    assert_eq!(base_key("  Sky Sport Uno HD (backup) "), plain);
}

#[test]
fn build_channels_with_name_and_key() {
    let channel = Channel::new("SKY UNO HD", "https://hattrick.ws/uno.htm");

    assert_eq!(channel.name, "Sky Sport Uno");
    assert_eq!(channel.base_key, "sky sport uno");
    assert_eq!(channel.page_url, "https://hattrick.ws/uno.htm");
    assert!(channel.stream_url.is_none());

    let resolved = channel.with_stream("https://cdn.example/uno/index.m3u8");
    assert_eq!(
        resolved.stream_url.as_deref(),
        Some("https://cdn.example/uno/index.m3u8")
    );
}

#[test]
fn keep_first_channel_per_stream_address() {
    let mut results = ResultSet::default();

    assert!(results.push(Channel::new("uno", "a").with_stream("https://s/1.m3u8")));
    assert!(!results.push(Channel::new("uno backup", "b").with_stream("https://s/1.m3u8")));
    assert!(results.push(Channel::new("calcio", "c").with_stream("https://s/2.m3u8")));
    // never resolved, never kept
    assert!(!results.push(Channel::new("arena", "d")));
    assert!(!results.push(Channel::new("tennis", "e").with_stream("")));

    let names: Vec<&str> = results.channels().iter().map(|c| c.page_url.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
}
