use std::time::Duration;

use hattrick::Error;
use hattrick::channel::RawChannel;
use hattrick::services::channel_list_services::{ChannelListService, parse_channel_list};
use url::Url;

const PAGE: &str = r#"
<html>
  <body>
    <div class="menu">
      <button class="ch"><a href="uno.htm"> SKY UNO HD </a></button>
      <button class="ch"><a href="https://hattrick.ws/calcio.htm">Sky <b>Calcio</b></a></button>
      <button class="ch"><a href="/arena.html">Arena</a></button>
      <a href="tennis.htm">Tennis outside a button</a>
      <button><a href="../dazn.htm">DAZN</a></button>
      <button><span>no link</span></button>
    </div>
  </body>
</html>
"#;

#[test]
fn pick_htm_links_inside_buttons_in_page_order() {
    let base = Url::parse("https://hattrick.ws/").unwrap();

    assert_eq!(
        parse_channel_list(PAGE, &base),
        vec![
            RawChannel {
                label: "SKY UNO HD".to_string(),
                href: "https://hattrick.ws/uno.htm".to_string(),
            },
            RawChannel {
                label: "Sky Calcio".to_string(),
                href: "https://hattrick.ws/calcio.htm".to_string(),
            },
            RawChannel {
                label: "DAZN".to_string(),
                href: "https://hattrick.ws/dazn.htm".to_string(),
            },
        ]
    );
}

#[test]
fn return_nothing_for_a_page_without_channels() {
    let base = Url::parse("https://hattrick.ws/").unwrap();
    assert!(parse_channel_list("<html><body>Just a moment...</body></html>", &base).is_empty());
}

#[test]
fn reject_an_invalid_source_url() {
    let err = ChannelListService::new("not a url", Duration::from_secs(1))
        .err()
        .unwrap();
    assert!(matches!(err, Error::ListFetch(_)));
    assert!(err.is_fatal());
}
