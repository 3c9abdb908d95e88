use padding_oracle::{
    hex_to_bytes, recover_message, AttackConfig, AttackError, HttpOracle, InitialCheckPolicy,
    Strategy,
};

fn usage(program: &str) -> ! {
    eprintln!(
        "usage: {program} ORACLE_URL CIPHERTEXT_HEX \
         [--serial] [--parallel] [--tag-len N] [--abort-on-invalid]"
    );
    std::process::exit(-1);
}

fn parse_args() -> (String, Vec<u8>, AttackConfig) {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("decrypt").to_string();
    if args.len() < 3 {
        usage(&program);
    }
    let url = args[1].clone();
    let ciphertext = match hex_to_bytes(&args[2]) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{e}");
            usage(&program);
        }
    };

    let mut config = AttackConfig::default();
    let mut flags = args[3..].iter();
    while let Some(flag) = flags.next() {
        match flag.as_str() {
            "--serial" => config.strategy = Strategy::Serial,
            "--parallel" => config.parallel_blocks = true,
            "--abort-on-invalid" => config.initial_check = InitialCheckPolicy::Abort,
            "--tag-len" => match flags.next().and_then(|n| n.parse().ok()) {
                Some(n) => config.tag_len = n,
                None => usage(&program),
            },
            _ => usage(&program),
        }
    }
    (url, ciphertext, config)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let (url, ciphertext, config) = parse_args();
    let oracle = HttpOracle::new(&url);

    let result = recover_message(&oracle, &ciphertext, &config)
        .await
        .and_then(|plaintext| String::from_utf8(plaintext).map_err(AttackError::from));
    match result {
        Ok(plaintext) => println!("{plaintext}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
