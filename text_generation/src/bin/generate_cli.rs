use text_generation::config::{build_generator, default_chat_config, default_template_config, GeneratorConfig};

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let use_chat = match args.first().map(String::as_str) {
        Some("--chat") => {
            args.remove(0);
            true
        }
        _ => false,
    };

    let prompt = args.join(" ").trim().to_owned();
    let prompt = if prompt.is_empty() { "street, minimal, denim".to_string() } else { prompt };

    let config = if use_chat { GeneratorConfig::ChatCompletion(default_chat_config()) } else { default_template_config() };
    let generator = match build_generator(&config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to initialize generator: {e}");
            std::process::exit(2);
        }
    };
    let info = generator.info();
    println!("provider: {:?}", info.provider);
    println!("model: {}", info.model_id);
    println!("prompt: {prompt}");

    match generator.generate(&prompt) {
        Ok(text) => println!("---\n{text}"),
        Err(e) => {
            eprintln!("generation failed: {e}");
            std::process::exit(1);
        }
    }
}
