use fairsend_core::File;
use fairsend_scheduler::score_breakdown;

pub fn score(weight: u64, waiting_since: u64, now: u64, clients: usize, format: &str) -> anyhow::Result<()> {
    let head = File::new(0, weight);
    let breakdown = score_breakdown(&head, waiting_since, clients, now);

    match format {
        "json" => {
            let value = serde_json::json!({
                "weight": weight,
                "waiting_since": waiting_since,
                "now": now,
                "clients": clients,
                "weight_score": breakdown.weight,
                "time_score": breakdown.time,
                "score": breakdown.total,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            println!("weight score: {:.6}", breakdown.weight);
            println!("time score:   {:.6}", breakdown.time);
            println!("score:        {:.6}", breakdown.total);
        }
    }

    Ok(())
}
