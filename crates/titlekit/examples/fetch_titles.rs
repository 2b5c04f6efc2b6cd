//! Example: Fetch titles for various URLs
//!
//! Run with: cargo run -p titlekit --example fetch_titles
//!
//! Needs network access. Each case is fetched with host tagging and friendly
//! errors enabled.

use titlekit::{FetchOptions, TitleFetcher};

struct TestCase {
    url: &'static str,
    description: &'static str,
    expect_contains: &'static str,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        url: "https://example.com",
        description: "Simple HTML page",
        expect_contains: "Example Domain",
    },
    TestCase {
        url: "https://httpbin.org/image/png",
        description: "PNG image",
        expect_contains: "PNG image",
    },
    TestCase {
        url: "https://httpbin.org/redirect-to?url=https%3A%2F%2Fexample.com%2F",
        description: "Redirect to another host",
        expect_contains: "httpbin.org \u{2192} example.com",
    },
    TestCase {
        url: "http://localhost/",
        description: "Blacklisted host",
        expect_contains: "Could not connect to server.",
    },
];

#[tokio::main]
async fn main() {
    println!("TitleKit URL Examples");
    println!("=====================\n");

    let fetcher = match TitleFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            println!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let options = FetchOptions::default()
        .with_hostname_tag(true)
        .with_friendly_errors(true);

    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in TEST_CASES.iter().enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);

        match fetcher.fetch_title(case.url, options).await {
            Ok(title) => {
                println!("   Title: {}", title);
                if title.contains(case.expect_contains) {
                    println!("   \u{2713} PASS\n");
                    passed += 1;
                } else {
                    println!("   Expected title to contain '{}'", case.expect_contains);
                    println!("   \u{2717} FAIL\n");
                    failed += 1;
                }
            }
            Err(e) => {
                println!("   Error: {}", e);
                println!("   \u{2717} FAIL\n");
                failed += 1;
            }
        }
    }

    println!("=====================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}
