use gecko_webhook::auth::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign};

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: gecko-push <webhook-url> <secret> <payload.json>");
    std::process::exit(1);
}

fn main() {
    let mut args = std::env::args().skip(1); // 跳过程序名

    let url = args.next().unwrap_or_else(|| {
        eprintln!("Missing <webhook-url>");
        print_usage_and_exit();
    });

    let secret = args.next().unwrap_or_else(|| {
        eprintln!("Missing <secret>");
        print_usage_and_exit();
    });

    let payload_path = args.next().unwrap_or_else(|| {
        eprintln!("Missing <payload.json>");
        print_usage_and_exit();
    });

    if args.next().is_some() {
        eprintln!("Too many arguments provided.");
        print_usage_and_exit();
    }

    let body = std::fs::read(&payload_path).unwrap_or_else(|e| {
        eprintln!("❌ Failed to read {}: {}", payload_path, e);
        std::process::exit(1);
    });

    if let Err(e) = serde_json::from_slice::<serde_json::Value>(&body) {
        eprintln!("❌ {} is not valid JSON: {}", payload_path, e);
        std::process::exit(1);
    }

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(&secret, &timestamp, &body);

    let client = reqwest::blocking::Client::new();
    let res = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, timestamp)
        .body(body)
        .send();

    match res {
        Ok(resp) => {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            if !status.is_success() {
                eprintln!("❌ Push rejected");
                eprintln!("{} | {}", status, text.trim());
                std::process::exit(1);
            } else {
                println!("✅ Push successful");
                println!("{}", text.trim());
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to contact webhook: {}", e);
            std::process::exit(1);
        }
    }
}
