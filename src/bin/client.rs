use clap::{Args, Parser, Subcommand};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Operator client for the cash desk payment server
#[derive(Parser, Debug)]
#[command(name = "cashdesk")]
#[command(about = "client cli used by cash desk staff to interact with the payment server", version, long_about = None
)]
struct Cli {
    /// base url of the payment server
    #[arg(long, env = "CASHDESK_HOST", default_value = "http://localhost:8080")]
    host: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// payment related ops
    #[command(arg_required_else_help = true)]
    Payment(PaymentArgs),
}

#[derive(Debug, Args)]
struct PaymentArgs {
    #[command(subcommand)]
    command: PaymentCmds,
}

#[derive(Debug, Subcommand)]
enum PaymentCmds {
    /// list payments
    List {
        #[arg(long, help = "Only payments of this cash desk.")]
        cash_desk: Option<i32>,
        #[arg(long, help = "Only payments from this day on (YYYY-MM-DD).", value_name = "DATE")]
        date_from: Option<String>,
    },
    /// show one payment with its items
    #[command(arg_required_else_help = true)]
    Show { id: i64 },
    /// open a payment on a cash desk
    #[command(arg_required_else_help = true)]
    Create {
        #[arg(long, help = "Cash desk number.")]
        cash_desk: i32,
        #[arg(long, help = "Registration number of the employee.")]
        employee: i32,
        #[arg(long = "type", help = "Cash, Maestro or CreditCard.", value_name = "PAYMENT_TYPE")]
        payment_type: String,
    },
    /// confirm (close) a payment
    #[command(arg_required_else_help = true)]
    Confirm { id: i64 },
    /// add an item to an open payment
    #[command(arg_required_else_help = true)]
    Item {
        id: i64,
        #[arg(long, help = "Article name.")]
        article: String,
        #[arg(long, help = "Quantity.", value_parser = clap::value_parser!(i32).range(1..))]
        amount: i32,
        #[arg(long, help = "Unit price.")]
        price: Decimal,
    },
    /// delete a payment
    #[command(arg_required_else_help = true)]
    Delete {
        id: i64,
        #[arg(long, help = "Delete the items of the payment as well.")]
        delete_items: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentView {
    id: i64,
    cash_desk_number: i32,
    employee_registration_number: i32,
    payment_type: String,
    payment_date_time: String,
    confirmed: Option<String>,
    #[serde(default)]
    items: Vec<ItemView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemView {
    article_name: String,
    amount: i32,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct Problem {
    detail: String,
}

fn print_payment(p: &PaymentView) {
    println!(
        "#{} cash desk {} employee {} {} opened {} {}",
        p.id,
        p.cash_desk_number,
        p.employee_registration_number,
        p.payment_type,
        p.payment_date_time,
        match &p.confirmed {
            Some(at) => format!("confirmed {}", at),
            None => "open".to_string(),
        }
    );
}

/// print why the server turned the request down
async fn print_rejection(res: Response) {
    let status = res.status();
    match res.json::<Problem>().await {
        Ok(problem) => println!("rejected ({}): {}", status, problem.detail),
        Err(_) => println!("got unexpected status code, {}", status),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    let host = args.host.trim_end_matches('/');
    let client = Client::new();

    match args.command {
        Commands::Payment(payment) => match payment.command {
            PaymentCmds::List { cash_desk, date_from } => {
                let mut query = Vec::new();
                if let Some(cash_desk) = cash_desk {
                    query.push(("cashDesk", cash_desk.to_string()));
                }
                if let Some(date_from) = date_from {
                    query.push(("dateFrom", date_from));
                }
                let res = client
                    .get(format!("{}/api/payments", host))
                    .query(&query)
                    .send()
                    .await?;
                match res.status() {
                    StatusCode::OK => {
                        let payments = res.json::<Vec<PaymentView>>().await?;
                        if payments.is_empty() {
                            println!("no payments found");
                        }
                        payments.iter().for_each(print_payment);
                    }
                    _ => print_rejection(res).await,
                }
            }
            PaymentCmds::Show { id } => {
                let res = client.get(format!("{}/api/payments/{}", host, id)).send().await?;
                match res.status() {
                    StatusCode::OK => {
                        let payment = res.json::<PaymentView>().await?;
                        print_payment(&payment);
                        for item in &payment.items {
                            println!("  {} x {} @ {}", item.amount, item.article_name, item.price);
                        }
                    }
                    StatusCode::NOT_FOUND => println!("payment {} not found", id),
                    _ => print_rejection(res).await,
                }
            }
            PaymentCmds::Create { cash_desk, employee, payment_type } => {
                println!("opening {} payment on cash desk={}", payment_type, cash_desk);
                let res = client
                    .post(format!("{}/api/payments", host))
                    .json(&serde_json::json!({
                        "cashDeskId": cash_desk,
                        "employeeId": employee,
                        "paymentType": payment_type,
                    }))
                    .send()
                    .await?;
                match res.status() {
                    StatusCode::CREATED => {
                        let payment = res.json::<PaymentView>().await?;
                        println!("payment opened successfully, payment id = {}", payment.id);
                    }
                    _ => print_rejection(res).await,
                }
            }
            PaymentCmds::Confirm { id } => {
                let res = client.patch(format!("{}/api/payments/{}", host, id)).send().await?;
                match res.status() {
                    StatusCode::NO_CONTENT => println!("payment {} confirmed", id),
                    StatusCode::NOT_FOUND => println!("payment {} not found", id),
                    _ => print_rejection(res).await,
                }
            }
            PaymentCmds::Item { id, article, amount, price } => {
                println!("adding {} x {} to payment={}", amount, article, id);
                let res = client
                    .post(format!("{}/api/payments/{}/items", host, id))
                    .json(&serde_json::json!({
                        "paymentId": id,
                        "articleName": article,
                        "amount": amount,
                        "price": price,
                    }))
                    .send()
                    .await?;
                match res.status() {
                    StatusCode::CREATED => println!("Successfully added item to payment id = {}", id),
                    _ => print_rejection(res).await,
                }
            }
            PaymentCmds::Delete { id, delete_items } => {
                let res = client
                    .delete(format!("{}/api/payments/{}", host, id))
                    .query(&[("deleteItems", delete_items)])
                    .send()
                    .await?;
                match res.status() {
                    StatusCode::NO_CONTENT => println!("payment {} deleted", id),
                    StatusCode::NOT_FOUND => println!("payment {} not found", id),
                    _ => print_rejection(res).await,
                }
            }
        },
    };
    Ok(())
}
