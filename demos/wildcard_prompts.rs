use promptgen::{CombinatorialGenerator, RandomGenerator, WildcardMap, WildcardProvider};
use std::error::Error;
use std::sync::Arc;

/// Example of expanding a template against an in-memory set of wildcards
fn main() -> Result<(), Box<dyn Error>> {
    let wildcards = WildcardMap::from_json_str(
        r#"{
            "animals": ["cat", "dog", "{barn|snowy} owl"],
            "colours": ["red", "green", "blue"],
            "places": ["in a forest", "on the moon", "under __colours__ skies"]
        }"#,
    )?;
    let provider: Arc<dyn WildcardProvider> = Arc::new(wildcards);

    let template = "A {2$$ and $$fluffy|tiny|__colours__} __animals__ __places__";

    println!("Random prompts:");
    let random = RandomGenerator::new(provider.clone());
    for (i, prompt) in random.generate(template, 5, Some(7))?.iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }

    println!("\nFirst combinations:");
    let combinatorial = CombinatorialGenerator::new(provider);
    for (i, prompt) in combinatorial.generate(template, 10)?.iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }

    Ok(())
}
