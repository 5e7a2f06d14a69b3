use deribitx::core::config::DeribitConfig;
use deribitx::core::types::{BookCadence, ModifyOrder, OrderType, SellOrder};
use deribitx::exchanges::deribit::{DeribitClient, MarketStream};
use serde_json::Value;
use std::io::{self, Write};
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let ws_host = config.ws_host();
    let client = DeribitClient::new(config)?;

    println!("Starting Deribit client...");
    let token = match client.authenticate().await {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Authentication failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("Authenticated.");

    loop {
        print_menu();
        let choice = prompt("Enter your choice: ")?;

        match choice.trim() {
            "1" => place_order(&client, &token).await?,
            "2" => modify_order(&client, &token).await?,
            "3" => sell_order(&client, &token).await?,
            "4" => {
                let order_id = prompt("Enter order ID: ")?;
                print_envelope(client.cancel_order(&token, order_id.trim()).await);
            }
            "5" => print_envelope(client.cancel_all(&token).await),
            "6" => print_envelope(client.open_orders(&token).await),
            "7" => {
                let currency = prompt("Enter currency (e.g. BTC): ")?;
                print_envelope(client.open_orders_by_currency(&token, currency.trim()).await);
            }
            "8" => {
                let instrument = prompt("Enter instrument name: ")?;
                print_envelope(
                    client
                        .open_orders_by_instrument(&token, instrument.trim())
                        .await,
                );
            }
            "9" => {
                let order_id = prompt("Enter order ID: ")?;
                print_envelope(client.order_state(&token, order_id.trim()).await);
            }
            "10" => {
                let currency = prompt("Enter currency (e.g. BTC): ")?;
                print_envelope(
                    client
                        .order_history_by_currency(&token, currency.trim())
                        .await,
                );
            }
            "11" => {
                let instrument = prompt("Enter instrument name: ")?;
                print_envelope(
                    client
                        .order_history_by_instrument(&token, instrument.trim())
                        .await,
                );
            }
            "12" => {
                let currency = prompt("Enter currency (e.g. BTC): ")?;
                print_envelope(
                    client
                        .user_trades_by_currency(&token, currency.trim())
                        .await,
                );
            }
            "13" => {
                let instrument = prompt("Enter instrument name: ")?;
                print_envelope(
                    client
                        .user_trades_by_instrument(&token, instrument.trim())
                        .await,
                );
            }
            "14" => {
                let currency = prompt("Enter currency (e.g. BTC): ")?;
                print_envelope(client.instruments(currency.trim()).await);
            }
            "15" => {
                let instrument = prompt("Enter instrument name: ")?;
                print_envelope(client.order_book(instrument.trim()).await);
            }
            "16" => {
                if let Err(e) = stream_book(&ws_host, &token).await {
                    println!("Stream failed: {}", e);
                }
            }
            "0" => {
                println!("Exiting...");
                return Ok(());
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

fn load_config() -> anyhow::Result<DeribitConfig> {
    #[cfg(feature = "env-file")]
    let config = DeribitConfig::from_env_file()?;
    #[cfg(not(feature = "env-file"))]
    let config = DeribitConfig::from_env()?;
    Ok(config)
}

fn print_menu() {
    println!();
    println!("1.  Place order");
    println!("2.  Modify order");
    println!("3.  Sell order");
    println!("4.  Cancel order");
    println!("5.  Cancel all orders");
    println!("6.  Get open orders");
    println!("7.  Get open orders by currency");
    println!("8.  Get open orders by instrument");
    println!("9.  Get order state");
    println!("10. Get order history by currency");
    println!("11. Get order history by instrument");
    println!("12. Get user trades by currency");
    println!("13. Get user trades by instrument");
    println!("14. Get instruments");
    println!("15. Get order book");
    println!("16. Stream order book updates");
    println!("0.  Exit");
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

fn prompt_f64(label: &str) -> anyhow::Result<Option<f64>> {
    let raw = prompt(label)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            println!("Not a number: {}", trimmed);
            Ok(None)
        }
    }
}

fn print_envelope(result: Result<Value, deribitx::ExchangeError>) {
    match result {
        Ok(envelope) => match serde_json::to_string_pretty(&envelope) {
            Ok(text) => println!("Response: {}", text),
            Err(_) => println!("Response: {}", envelope),
        },
        Err(e) => println!("Request failed: {}", e),
    }
}

async fn place_order(client: &DeribitClient, token: &str) -> anyhow::Result<()> {
    let instrument = prompt("Enter instrument name: ")?;
    let type_raw = prompt("Enter order type (limit/market/stop_limit/stop_market): ")?;
    let order_type: OrderType = match type_raw.trim().parse() {
        Ok(t) => t,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    let Some(amount) = prompt_f64("Enter amount: ")? else {
        println!("Amount is required.");
        return Ok(());
    };
    let price = if order_type.requires_price() {
        prompt_f64("Enter price: ")?
    } else {
        None
    };
    let label = prompt("Enter label (optional): ")?;

    let started = Instant::now();
    let result = client
        .place_order(
            token,
            instrument.trim(),
            order_type,
            amount,
            price,
            Some(label.trim()),
        )
        .await;
    let latency = started.elapsed().as_millis();

    print_envelope(result);
    println!("Order placement latency: {} ms", latency);
    Ok(())
}

async fn modify_order(client: &DeribitClient, token: &str) -> anyhow::Result<()> {
    let order_id = prompt("Enter order ID: ")?;
    let mut order = ModifyOrder::new(order_id.trim());
    order.amount = prompt_f64("Enter new amount (blank to skip): ")?;
    order.contracts = prompt_f64("Enter new contracts (blank to skip): ")?;
    order.price = prompt_f64("Enter new price (blank to skip): ")?;

    print_envelope(client.modify_order(token, &order).await);
    Ok(())
}

async fn sell_order(client: &DeribitClient, token: &str) -> anyhow::Result<()> {
    let instrument = prompt("Enter instrument name: ")?;
    let mut order = SellOrder::new(instrument.trim());
    order.amount = prompt_f64("Enter amount (blank to skip): ")?;
    order.price = prompt_f64("Enter price (blank to skip): ")?;
    let type_raw = prompt("Enter order type (blank to skip): ")?;
    if !type_raw.trim().is_empty() {
        match type_raw.trim().parse() {
            Ok(t) => order.order_type = Some(t),
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        }
    }

    print_envelope(client.sell_order(token, &order).await);
    Ok(())
}

async fn stream_book(ws_host: &str, token: &str) -> anyhow::Result<()> {
    let instrument = prompt("Enter the instrument (e.g. BTC-PERPETUAL) to subscribe: ")?;
    println!("Choose the interval:");
    println!("1. 100ms");
    println!("2. raw");
    println!("3. agg2");
    let choice: u32 = prompt("Enter your choice: ")?.trim().parse().unwrap_or(3);
    let cadence = BookCadence::from_choice(choice);

    let mut stream = MarketStream::open(ws_host, 443, token).await?;
    let channel = stream.subscribe(instrument.trim(), cadence).await?;
    println!("Subscribed to channel: {}", channel);

    let mut updates = stream.into_updates();
    while let Some(update) = updates.recv().await {
        if let Some(delay) = update.propagation_delay_ms {
            println!("Propagation delay: {} ms", delay);
        }
        println!("Received update: {:?}", update.event);
    }
    println!("Stream ended.");
    Ok(())
}
