use promptgen::{GenerationMode, GeneratorBuilder, GeneratorConfig, WildcardMap};
use std::error::Error;
use std::sync::Arc;

/// Example of configuring generators the way a batch pipeline would
fn main() -> Result<(), Box<dyn Error>> {
    let provider = Arc::new(WildcardMap::new().insert("styles", ["oil painting", "watercolour", "pencil sketch"]));
    let template = "A lighthouse at {dawn|dusk|night}, __styles__";

    // Seeded random generation, the RNG carried across calls
    let config = GeneratorConfig {
        seed: Some(1234),
        ..GeneratorConfig::default()
    };
    let mut random = GeneratorBuilder::new(provider.clone()).config(config).build();
    for batch in 1..=2 {
        println!("Random batch {}:", batch);
        for prompt in random.generate(template, 3)? {
            println!("  {}", prompt);
        }
    }

    // One prompt repeated for every image in the batch
    let mut frozen = GeneratorBuilder::new(provider.clone())
        .seed(99)
        .freeze_prompt(true)
        .build();
    println!("\nFrozen: {:?}", frozen.generate(template, 3)?);

    // Every combination, twice over
    let config = GeneratorConfig::from_json_str(r#"{"mode": "combinatorial", "combinatorial_batches": 2}"#)?;
    assert_eq!(config.mode, GenerationMode::Combinatorial);
    let mut combinatorial = GeneratorBuilder::new(provider).config(config).build();
    let prompts = combinatorial.generate(template, 0)?;
    println!("\n{} combinatorial prompts:", prompts.len());
    for (i, prompt) in prompts.iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }

    Ok(())
}
