use criterion::{criterion_group, criterion_main, Criterion};
use page_loader::{is_same_site, name_for, normalize, resolve, HtmlDocument, ReferenceClass};
use std::hint::black_box;
use url::Url;

const PAGE: &str = r#"
    <html>
        <head>
            <link rel="stylesheet" href="/style.css">
            <script src="/script.js"></script>
            <link rel="stylesheet" href="../theme.css">
            <script src="utils.js"></script>
        </head>
        <body>
            <img src="/logo.png" alt="Logo">
            <img src="https://cdn.example.com/banner.jpg" alt="Banner">
            <img src="http://other.com/pixel.gif">
        </body>
    </html>
"#;

fn bench_normalize(c: &mut Criterion) {
    let inputs = [
        "example.com/path",
        "https://example.com/a/b/c.html",
        "localhost:8080/docs",
        "https://sub.example.com/x?q=1#frag",
    ];

    c.bench_function("normalize", |b| {
        b.iter(|| {
            for input in &inputs {
                let _url = normalize(black_box(input)).unwrap();
            }
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let parent = Url::parse("https://example.com/a/b/c/page.html").unwrap();
    let references = [
        "../style.css",
        "./script.js",
        "images/photo.jpg",
        "/root.css",
        "../../../../../../deep.png",
        "https://cdn.example.com/style.css",
        "//cdn.example.com/script.js",
    ];

    c.bench_function("resolve", |b| {
        b.iter(|| {
            for reference in &references {
                let _url = resolve(black_box(reference), &parent).unwrap();
                let _same = is_same_site(&parent, black_box(reference));
            }
        });
    });
}

fn bench_name_for(c: &mut Criterion) {
    let urls: Vec<Url> = [
        "https://example.com/",
        "https://sub1.example.com/path/to/file.1.2.html",
        "https://example.com/assets/app.js?v=42",
    ]
    .iter()
    .map(|u| Url::parse(u).unwrap())
    .collect();

    c.bench_function("name_for", |b| {
        b.iter(|| {
            for url in &urls {
                let _name = name_for(black_box(url), Some("image/png"), None);
                let _dir = name_for(black_box(url), None, Some("_files"));
            }
        });
    });
}

fn bench_discovery(c: &mut Criterion) {
    c.bench_function("parse_and_discover", |b| {
        b.iter(|| {
            let document = HtmlDocument::parse(black_box(PAGE));
            let _references = document.asset_references(&ReferenceClass::ALL);
        });
    });
}

criterion_group!(benches, bench_normalize, bench_resolve, bench_name_for, bench_discovery);
criterion_main!(benches);
