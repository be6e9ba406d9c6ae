use std::sync::Arc;
use std::thread;
use tallyq::prelude::*;

fn main() -> QueueResult<()> {
    tallyq::logging::init(&LoggingConfig::default())?;

    let queue = Arc::new(BoundedQueue::new(4));

    let producers: Vec<_> = (0..3)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || -> QueueResult<()> {
                for i in 0..100 {
                    let id = p * 100 + i;
                    queue.blocking_enqueue(Task::new(id, format!("Task_{}", id)))?;
                }
                Ok(())
            })
        })
        .collect();

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut consumed = 0;
            while let Some(task) = queue.blocking_dequeue() {
                let _task = task.complete();
                consumed += 1;
            }
            consumed
        })
    };

    for producer in producers {
        producer.join().expect("producer thread panicked")?;
    }
    queue.close();
    let consumed = consumer.join().expect("consumer thread panicked");

    println!("consumed {} tasks", consumed);
    println!("{}", serde_json::to_string_pretty(&queue.stats())?);
    Ok(())
}
