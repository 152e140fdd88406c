//! Networks command implementation.

use ledgerview_sync::NetworkConfig;

/// Runs the networks command.
pub fn run(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let networks = NetworkConfig::PRESETS
        .iter()
        .map(|name| NetworkConfig::preset(name))
        .collect::<Result<Vec<_>, _>>()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&networks)?),
        _ => {
            for network in &networks {
                println!("{}", network.name);
                println!("  access node: {}", network.access_node);
                for (contract, address) in &network.contracts {
                    println!("  {contract:<10} 0x{address}");
                }
            }
        }
    }

    Ok(())
}
