use hattrick::Error;
use hattrick::channel::Channel;
use hattrick::services::PlaylistWriter;

const LOGO: &str = "https://logo.example/sky.jpg";

fn writer(path: impl Into<std::path::PathBuf>) -> PlaylistWriter {
    PlaylistWriter::new(path, LOGO, "Sky Sport IPTV")
}

#[test]
fn render_header_and_numbered_entries() {
    let channels = vec![
        Channel::new("uno", "https://hattrick.ws/uno.htm").with_stream("https://s.example/1.m3u8"),
        Channel::new("calcio", "https://hattrick.ws/calcio.htm")
            .with_stream("https://s.example/2.m3u8"),
    ];

    let expected = "#EXTM3U\n\n\
#EXTINF:-1 tvg-id=\"1\" group-title=\"Sky Sport IPTV\" tvg-logo=\"https://logo.example/sky.jpg\", Sky Sport Uno\n\
https://s.example/1.m3u8\n\n\
#EXTINF:-1 tvg-id=\"2\" group-title=\"Sky Sport IPTV\" tvg-logo=\"https://logo.example/sky.jpg\", Sky Sport Calcio\n\
https://s.example/2.m3u8\n\n";

    assert_eq!(writer("unused.m3u8").render(&channels), expected);
}

#[test]
fn render_only_the_header_for_nothing() {
    assert_eq!(writer("unused.m3u8").render(&[]), "#EXTM3U\n\n");
}

#[test]
fn skip_unresolved_channels_without_leaving_gaps() {
    let channels = vec![
        Channel::new("uno", "a"),
        Channel::new("calcio", "b").with_stream("https://s.example/2.m3u8"),
    ];

    let rendered = writer("unused.m3u8").render(&channels);
    assert!(rendered.contains("tvg-id=\"1\""));
    assert!(!rendered.contains("tvg-id=\"2\""));
    assert!(!rendered.contains("Sky Sport Uno"));
}

#[tokio::test]
async fn truncate_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hattrick.m3u8");
    std::fs::write(&path, "old content that is much longer than the new playlist ".repeat(50))
        .unwrap();

    let channels = vec![Channel::new("arena", "a").with_stream("https://s.example/3.m3u8")];
    writer(&path).write(&channels).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("#EXTM3U\n\n#EXTINF:-1 tvg-id=\"1\""));
    assert!(!written.contains("old content"));
}

#[tokio::test]
async fn report_unwritable_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("hattrick.m3u8");

    let err = writer(&path).write(&[]).await.unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
    assert!(err.is_fatal());
}
