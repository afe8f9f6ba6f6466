//! Emberdeep - Entry Point
//!
//! Interactive demo encounter: one player-controlled hero against one
//! randomly spawned enemy, driven from stdin. The battle core publishes
//! every phase change and damage exchange on the event channel; this binary
//! is just a driver that prints them.

use emberdeep::battle::{
    battle_channel, player_controller, ActionController, AnimationController, BattleEvent,
    BattleEventReceiver, BattleStateMachine, Combatant, EnemyGenerator, EnemyTemplate, UnitHandle,
    UnitModel,
};
use emberdeep::core::config::BattleConfig;
use emberdeep::core::error::Result;
use emberdeep::core::types::{Side, UnitId};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("emberdeep=info")
        .init();

    let rt = Runtime::new()?;
    rt.block_on(run_encounter())
}

fn bestiary() -> Vec<EnemyTemplate> {
    vec![
        EnemyTemplate {
            name: "Goblin".into(),
            health: 20,
            damage: 5,
            description: "Small, mean, and fond of ankles.".into(),
        },
        EnemyTemplate {
            name: "Skeleton".into(),
            health: 15,
            damage: 7,
            description: "Rattles when it swings.".into(),
        },
        EnemyTemplate {
            name: "Cave Troll".into(),
            health: 35,
            damage: 4,
            description: "Slow, but very committed.".into(),
        },
    ]
}

async fn run_encounter() -> Result<()> {
    // a human typing needs more than the default 3 s turn bound
    let config = BattleConfig {
        turn_timeout_ms: 30_000,
        ..BattleConfig::default()
    };
    let (events, receiver) = battle_channel(config.event_capacity);

    let hero = UnitHandle::new(
        UnitModel::new("Hero", 30, 10).with_description("The dungeon delver."),
    );
    let hero_id = hero.id();
    let (controller, input) = player_controller();
    let player = Combatant::new(
        hero.clone(),
        Side::Player,
        ActionController::Player(controller),
        AnimationController::Disabled,
    );

    let generator = EnemyGenerator::new(&config);
    let Some(enemy) = generator.spawn(&bestiary()) else {
        return Ok(());
    };
    let enemy_id = enemy.id();
    let enemy_unit = enemy.unit.clone();

    println!("=== EMBERDEEP ===");
    println!(
        "A {} blocks the corridor!",
        enemy_unit.with(|u| u.name().to_string())
    );
    println!("Commands: attack (a) | status (s) | quit (q)");

    tokio::spawn(print_events(receiver, hero_id));

    let mut machine = BattleStateMachine::new(vec![player, enemy], events, config);
    let stop = machine.stop_handle();

    let run = machine.run();
    tokio::pin!(run);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            result = &mut run => {
                result?;
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    stop.stop();
                    input.disable();
                    continue;
                };
                match line.trim() {
                    "attack" | "a" => input.select_target(enemy_id),
                    "status" | "s" => {
                        let units = vec![hero.snapshot(), enemy_unit.snapshot()];
                        println!("{}", serde_json::to_string_pretty(&units)?);
                    }
                    "quit" | "q" => {
                        stop.stop();
                        input.disable();
                    }
                    "" => {}
                    other => println!("unknown command: {other}"),
                }
            }
        }
    }

    Ok(())
}

async fn print_events(mut receiver: BattleEventReceiver, hero: UnitId) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match receiver.recv().await {
            Ok(BattleEvent::RoundStarted { round }) => println!("-- round {round} --"),
            Ok(BattleEvent::TurnStarted { unit, .. }) if unit == hero => {
                println!("Your turn: type 'attack' to strike.");
            }
            Ok(BattleEvent::TurnStarted { .. }) => println!("The enemy sizes you up..."),
            Ok(BattleEvent::DamageApplied {
                amount, remaining, ..
            }) => println!("A blow lands for {amount} ({remaining} hp left)."),
            Ok(BattleEvent::UnitDefeated { unit }) => {
                if unit == hero {
                    println!("You collapse.");
                } else {
                    println!("The enemy falls.");
                }
            }
            Ok(BattleEvent::Finished { outcome }) => {
                println!("Battle over: {outcome:?}.");
            }
            Ok(BattleEvent::StateChanged { .. }) => {}
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}
