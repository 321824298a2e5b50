use super::*;
use crate::score::technical_score;

const ABSENCE_IDS: &[&str] = &[
    "gtm_missing",
    "no_email",
    "bad_title",
    "no_favicon",
    "no_social",
    "no_description",
    "no_viewport",
    "no_canonical",
    "no_h1",
    "no_lang",
    "thin_content",
    "no_privacy",
    "no_terms",
];

fn signal<'a>(signals: &'a [Signal], id: &str) -> &'a Signal {
    signals
        .iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("missing signal {id}"))
}

fn detected_ids(signals: &[Signal]) -> Vec<&str> {
    signals
        .iter()
        .filter(|s| s.detected)
        .map(|s| s.id.as_str())
        .collect()
}

fn healthy_page() -> String {
    let copy = "Acme builds durable garden tools for professional landscapers. ".repeat(30);
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <title>Acme Garden Tools | Durable Equipment</title>
  <meta name="description" content="Durable garden tools">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="icon" href="/favicon.ico">
  <link rel="canonical" href="https://acme.example/">
  <script async src="https://www.googletagmanager.com/gtag/js?id=G-TEST"></script>
</head>
<body>
  <h1>Acme Garden Tools</h1>
  <p>{copy}</p>
  <p>Write to hello@acme.example for wholesale orders.</p>
  <footer>
    <a href="https://twitter.com/acme">Follow us</a>
    <a href="/privacy">Privacy Policy</a>
    <a href="/terms">Terms of Service</a>
  </footer>
</body>
</html>"#
    )
}

#[test]
fn battery_has_27_detectors_with_unique_ids() {
    let signals = detect("");
    assert_eq!(signals.len(), 27);
    assert_eq!(detector_count(), 27);

    let mut ids: Vec<&str> = signals.iter().map(|s| s.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 27);
}

#[test]
fn signals_come_back_in_evaluation_order() {
    let signals = detect("<p>hi</p>");
    assert_eq!(signals[0].id, "gtm_missing");
    assert_eq!(signals[6].id, "poison_words");
    assert_eq!(signals[26].id, "missing_alt");
}

#[test]
fn detection_is_deterministic() {
    let html = healthy_page();
    assert_eq!(detect(&html), detect(&html));
}

#[test]
fn empty_markup_trips_every_absence_detector() {
    let signals = detect("");
    for id in ABSENCE_IDS {
        assert!(signal(&signals, id).detected, "{id} should be detected");
    }
    assert!(!signal(&signals, "poison_words").detected);
    assert!(!signal(&signals, "heavy_page").detected);
    assert!(!signal(&signals, "multiple_h1").detected);
}

#[test]
fn healthy_page_trips_nothing() {
    let signals = detect(&healthy_page());
    assert!(
        detected_ids(&signals).is_empty(),
        "unexpected detections: {:?}",
        detected_ids(&signals)
    );
    assert_eq!(technical_score(&signals), 0);
}

#[test]
fn poison_evidence_names_matched_term() {
    let signals = detect("<html><body><p>best online casino bonus</p></body></html>");
    let poison = signal(&signals, "poison_words");
    assert!(poison.detected);
    assert_eq!(poison.severity, Severity::Critical);
    assert!(poison.description.contains("casino"), "{}", poison.description);
}

#[test]
fn poison_words_ignore_script_text() {
    let signals =
        detect("<html><body><script>var casino = 1;</script><p>Plain copy.</p></body></html>");
    assert!(!signal(&signals, "poison_words").detected);
}

#[test]
fn clean_page_reports_no_suspicious_terms() {
    let signals = detect(&healthy_page());
    assert_eq!(
        signal(&signals, "poison_words").description,
        "No suspicious terms found."
    );
}

#[test]
fn spammy_page_scores_at_least_55() {
    let html = r#"<html><head>
        <meta http-equiv="Refresh" content="0;url=https://elsewhere.example">
        </head><body>
        <p>Best online casino bonus, claim now!</p>
        <script>eval(unescape('%61%6c%65%72%74'));</script>
        </body></html>"#;
    let signals = detect(html);
    assert!(signal(&signals, "poison_words").detected);
    assert!(signal(&signals, "obfuscated_js").detected);
    assert!(signal(&signals, "meta_refresh").detected);
    assert!(technical_score(&signals) >= 55);
}

#[test]
fn untitled_pharma_page_with_plain_http_links_scores_at_least_55() {
    let links = (0..20)
        .map(|i| format!(r#"<a href="http://partner{i}.example">partner {i}</a>"#))
        .collect::<String>();
    let html =
        format!("<html><head></head><body><p>Cheap viagra delivered</p>{links}</body></html>");
    let signals = detect(&html);

    for id in [
        "poison_words",
        "insecure_links",
        "no_description",
        "no_favicon",
        "bad_title",
    ] {
        assert!(signal(&signals, id).detected, "{id} should be detected");
    }
    assert!(signal(&signals, "poison_words").description.contains("viagra"));
    assert!(technical_score(&signals) >= 55);
}

#[test]
fn insecure_links_counts_http_hrefs() {
    let signals =
        detect(r#"<a href="http://old.example">old</a><a href="https://new.example">new</a>"#);
    let insecure = signal(&signals, "insecure_links");
    assert!(insecure.detected);
    assert!(insecure.description.contains('1'), "{}", insecure.description);
}

#[test]
fn title_length_bounds_are_inclusive() {
    let ok = detect("<title>0123456789</title>");
    assert!(!signal(&ok, "bad_title").detected);

    let short = detect("<title>Home</title>");
    assert!(signal(&short, "bad_title").detected);

    let long = format!("<title>{}</title>", "x".repeat(71));
    assert!(signal(&detect(&long), "bad_title").detected);
}

#[test]
fn link_stuffing_needs_many_links_and_little_text() {
    let links: String = (0..11)
        .map(|i| format!(r#"<a href="https://site{i}.example">s</a>"#))
        .collect();
    let signals = detect(&format!("<body>{links}</body>"));
    assert!(signal(&signals, "link_stuffing").detected);

    let ten: String = (0..10)
        .map(|i| format!(r#"<a href="https://site{i}.example">s</a>"#))
        .collect();
    let signals = detect(&format!("<body>{ten}</body>"));
    assert!(!signal(&signals, "link_stuffing").detected);
}

#[test]
fn h1_counting() {
    let none = detect("<body><h2>x</h2></body>");
    assert!(signal(&none, "no_h1").detected);
    assert!(!signal(&none, "multiple_h1").detected);

    let two = detect("<body><h1>a</h1><h1>b</h1></body>");
    assert!(!signal(&two, "no_h1").detected);
    assert!(signal(&two, "multiple_h1").detected);
}

#[test]
fn blank_lang_counts_as_missing() {
    let signals = detect(r#"<html lang="  "><body></body></html>"#);
    assert!(signal(&signals, "no_lang").detected);
}

#[test]
fn plugin_and_iframe_elements_are_flagged() {
    let signals = detect(r#"<body><iframe src="x"></iframe><object data="a.swf"></object></body>"#);
    assert!(signal(&signals, "iframe_detected").detected);
    assert!(signal(&signals, "flash_content").detected);
}

#[test]
fn empty_links_threshold_is_exclusive() {
    let five = r##"<a href="#">a</a>"##.repeat(5);
    assert!(!signal(&detect(&five), "empty_links").detected);

    let six = format!(r##"{five}<a href="javascript:void(0)">b</a>"##);
    assert!(signal(&detect(&six), "empty_links").detected);
}

#[test]
fn heavy_page_over_250kb() {
    let html = format!("<body><p>{}</p></body>", "a".repeat(HEAVY_PAGE_BYTES));
    assert!(signal(&detect(&html), "heavy_page").detected);
}

#[test]
fn element_count_thresholds() {
    let scripts = "<script></script>".repeat(31);
    assert!(signal(&detect(&scripts), "script_bloat").detected);

    let styled = r#"<div style="color:red">x</div>"#.repeat(21);
    assert!(signal(&detect(&styled), "inline_styles").detected);

    let images = r#"<img src="a.png">"#.repeat(6);
    assert!(signal(&detect(&images), "missing_alt").detected);

    let described = r#"<img src="a.png" alt="">"#.repeat(6);
    assert!(!signal(&detect(&described), "missing_alt").detected);
}

#[test]
fn garbage_markup_does_not_panic() {
    let signals = detect("<<<>>></div></p><html lang=<body>\u{0}\u{feff}");
    assert_eq!(signals.len(), 27);
}

#[test]
fn deeply_nested_markup_keeps_visible_text() {
    let html = format!(
        "<body>{}<script>casino()</script><noscript>lottery</noscript>",
        "<div>a".repeat(3_000)
    );
    let page = Page::parse(&html);

    assert_eq!(page.text_chars(), "a ".repeat(3_000).trim_end().len());
    assert!(!page.body_lower.contains("casino"));
    assert!(!page.body_lower.contains("lottery"));
    assert_eq!(detect(&html).len(), 27);
}

