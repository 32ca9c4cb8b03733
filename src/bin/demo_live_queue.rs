// Live queue demo - drives the sequencer through a scripted performance
// A stand-in engine loop supplies beat ticks and drains the command channel

use groovequeue::{
    ChangeNotification, EngineCommand, PatternRef, QueueSequencer, create_command_channel,
    create_notification_channel,
};
use ringbuf::traits::Consumer;

fn main() {
    env_logger::init();

    println!("=== groovequeue - live queue demo ===\n");

    let (cmd_tx, mut cmd_rx) = create_command_channel(256);
    let (ntf_tx, mut ntf_rx) = create_notification_channel(256);
    let mut sequencer = QueueSequencer::new(cmd_tx, ntf_tx);

    // two tracks: a looping drum pattern and a one-shot fill
    let drums = PatternRef::new(0, 0);
    let fill = PatternRef::new(0, 1);

    sequencer.add_track(0).unwrap();
    sequencer.add_track(1).unwrap();
    sequencer.add_slot(drums);
    sequencer.add_slot(fill);
    sequencer.add_channel(drums, 0).unwrap();
    sequencer
        .add_channel(fill, 1)
        .unwrap()
        .set_loop_enabled(false);

    println!("Arming {drums} (loop, track 0) and starting the transport");
    sequencer.touch(drums);
    sequencer.play();

    for measure in 0..6u32 {
        for local_beat in 0..4u32 {
            let beat = (measure * 4 + local_beat) as f32;
            sequencer.beat_change(measure as i32, beat);

            // a fill gets queued halfway through measure 2
            if measure == 2 && local_beat == 1 {
                println!("Queueing {fill} (one-shot, track 1)");
                sequencer.touch(fill);
            }
        }

        println!("\nmeasure {measure}:");
        for (pattern_index, slot) in sequencer.view(0) {
            println!("  pattern {:>2}  {:?}", pattern_index, slot.state());
        }
        while let Some(event) = ntf_rx.try_pop() {
            if let ChangeNotification::TimelineSplice {
                track,
                measure,
                pattern,
            } = event
            {
                println!("  spliced {pattern} on track {track} at measure {measure}");
            }
        }
    }

    sequencer.stop();

    println!("\nCommands the engine received:");
    while let Some(command) = cmd_rx.try_pop() {
        match command {
            EngineCommand::AssignPattern {
                track,
                start_measure,
                pattern,
                ..
            } => println!("  assign {pattern} -> track {track} @ measure {start_measure}"),
            other => println!("  {other:?}"),
        }
    }

    println!("\nFinal timelines:");
    for track in sequencer.song().tracks() {
        let ranges: Vec<String> = track
            .timeline()
            .placements()
            .iter()
            .map(|p| format!("{}[{},{})", p.pattern, p.start_measure, p.end_measure()))
            .collect();
        println!("  track {}: {}", track.index(), ranges.join(" "));
    }
}
