//! End-to-end checks through the public API: config file on disk, media
//! library from JSON, HTML and srcset rewriting with signed URLs.

use ngx_resizer::ImageResizer;
use ngx_resizer::config::load_config;
use ngx_resizer::host::InMemoryMediaLibrary;
use ngx_resizer::secure_url::sign;
use ngx_resizer::srcset::{format_srcset, parse_srcset};
use ngx_resizer::types::{ImageSource, SizeSpec};
use std::fs;
use tempfile::TempDir;

const MEDIA: &str = r#"{
    "7": { "url": "https://example.com/wp-content/uploads/2024/05/a.jpg", "width": 2000, "height": 1000 }
}"#;

fn config_toml(base_dir: &str) -> String {
    format!(
        r#"
secure_link = "%uri%%w%%h%%crop% s3cret"
content_width = 640

[uploads]
base_url = "https://example.com/wp-content/uploads"
base_dir = {base_dir:?}

[sizes.thumbnail]
width = 100
height = 100
crop = true

[sizes.extra.hero]
width = 1600
height = 900
crop = ["center", "top"]
"#
    )
}

fn setup() -> (TempDir, ImageResizer, InMemoryMediaLibrary) {
    let tmp = TempDir::new().unwrap();
    let uploads = tmp.path().join("uploads");
    fs::create_dir_all(uploads.join("2024/05")).unwrap();
    fs::write(uploads.join("2024/05/b.jpg"), b"").unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        config_toml(&uploads.to_string_lossy()),
    )
    .unwrap();

    let resizer = ImageResizer::new(load_config(tmp.path()).unwrap());
    let media = InMemoryMediaLibrary::from_json(MEDIA).unwrap();
    (tmp, resizer, media)
}

#[test]
fn content_images_are_signed_and_sized() {
    let (_tmp, resizer, media) = setup();
    let html = r#"<p>Intro</p>
<a href="https://example.com/wp-content/uploads/2024/05/a.jpg"><img class="size-thumbnail wp-image-7" src="https://example.com/wp-content/uploads/2024/05/a-100x100.jpg" alt=""></a>
<p>Outro</p>"#;

    let out = resizer.rewrite_content(html, &media);

    let digest = sign("/wp-content/uploads/2024/05/a.jpg1001001 s3cret");
    let expected_src = format!(
        "https://example.com/wp-content/uploads/2024/05/a.jpg?w=100&h=100&crop=1&d={digest}"
    );
    assert!(out.contains(&format!("src=\"{expected_src}\"")), "{out}");
    // The link still points at the original
    assert!(out.contains(r#"<a href="https://example.com/wp-content/uploads/2024/05/a.jpg">"#));
    assert!(out.starts_with("<p>Intro</p>"));
    assert!(out.ends_with("<p>Outro</p>"));
}

#[test]
fn wide_content_image_is_capped_and_derivative_mapped_back() {
    let (_tmp, resizer, media) = setup();
    let html = r#"<img src="https://example.com/wp-content/uploads/2024/05/b-1280x720.jpg" width="1280" height="720">"#;

    let out = resizer.rewrite_content(html, &media);

    let digest = sign("/wp-content/uploads/2024/05/b.jpg640360 s3cret");
    assert!(out.contains(&format!(
        "src=\"https://example.com/wp-content/uploads/2024/05/b.jpg?w=640&h=360&d={digest}\""
    )));
    assert!(out.contains(r#"width="640" height="360" "#));
}

#[test]
fn remote_images_are_signed_against_safe_image() {
    let (_tmp, resizer, media) = setup();
    let out = resizer.rewrite_content(r#"<img src="https://cdn.test/x.png" width="300">"#, &media);

    let digest = sign("/safe_image300 s3cret");
    assert!(out.contains(&format!(
        "https://example.com/safe_image?url=https%3A%2F%2Fcdn.test%2Fx.png&w=300&d={digest}"
    )));
}

#[test]
fn attachment_sizes_resolve_through_registry() {
    let (_tmp, resizer, media) = setup();

    let hero = resizer
        .resolve_downsized_image(&ImageSource::LocalAttachment(7), &SizeSpec::named("hero"), &media)
        .unwrap();
    assert_eq!((hero.width, hero.height), (Some(1600), Some(900)));
    assert!(hero.url.contains("?w=1600&h=900&crop=1&d="));

    // large is capped at the content width
    let large = resizer
        .resolve_downsized_image(&ImageSource::LocalAttachment(7), &SizeSpec::named("large"), &media)
        .unwrap();
    assert_eq!((large.width, large.height), (Some(640), Some(320)));
    assert!(large.url.contains("?w=640&h=320&d="));
}

#[test]
fn srcset_roundtrip_through_attribute() {
    let (_tmp, resizer, media) = setup();
    let attr = "https://example.com/wp-content/uploads/2024/05/a-300x150.jpg 300w, \
                https://example.com/wp-content/uploads/2024/05/a-768x384.jpg 768w";

    let rewritten = resizer.rewrite_srcset(&parse_srcset(attr), Some(7), &media);
    let formatted = format_srcset(&rewritten);

    assert_eq!(rewritten.len(), 2);
    assert!(formatted.contains("a.jpg?w=300&h=150&crop=1&d="));
    assert!(formatted.contains("a.jpg?w=768&h=384&crop=1&d="));
    assert!(formatted.ends_with(" 768w"));
}
