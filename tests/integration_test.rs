use std::path::PathBuf;
use std::time::Duration;

use matmul_comm::{Communicator, GrpcCommunicator, GrpcOptions, ServerAddr, WorkerIdentity};
use matrix_mul::multiply::multiply;
use matrix_mul::store::load_file;
use matrix_mul::sweep::{SweepPlan, Verdict, run_distributed, verify};
use matrix_mul::{Error, Matrix, Worker};
use tokio::net::TcpListener;

/// Binds one mailbox per rank on an ephemeral port.
async fn start_world(workers: usize, options: GrpcOptions) -> Vec<GrpcCommunicator> {
    let mut listeners = Vec::new();
    let mut peers = Vec::new();
    for _ in 0..workers {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        peers.push(ServerAddr::from(listener.local_addr().unwrap().to_string()));
        listeners.push(listener);
    }

    listeners
        .into_iter()
        .enumerate()
        .map(|(rank, listener)| {
            let identity = WorkerIdentity::new(rank, workers).unwrap();
            GrpcCommunicator::with_listener(identity, listener, peers.clone(), options.clone())
                .unwrap()
        })
        .collect()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matmul-launch-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn test_grpc_round() {
    let world = start_world(3, GrpcOptions::default()).await;
    let a = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
    let b = Matrix::from_rows(vec![vec![9, 8, 7], vec![6, 5, 4], vec![3, 2, 1]]).unwrap();
    let expected = multiply(&a, &b).unwrap();

    let mut handles = Vec::new();
    for comm in world {
        let inputs = comm
            .identity()
            .is_coordinator()
            .then(|| (a.clone(), b.clone()));
        handles.push(tokio::spawn(async move {
            Worker::new(&comm).run_round(inputs).await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outcomes[0].as_ref().unwrap().result, expected);
    assert!(outcomes[1..].iter().all(Option::is_none));
}

#[tokio::test]
async fn test_grpc_sweep() {
    let world = start_world(4, GrpcOptions::default()).await;
    let plan = SweepPlan::new(vec![3, 10, 2], scratch_dir("sweep"), Some(7)).unwrap();

    let mut handles = Vec::new();
    for comm in world {
        let plan = plan.clone();
        handles.push(tokio::spawn(async move {
            run_distributed(&comm, &plan).await
        }));
    }

    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.unwrap().unwrap());
    }
    let report = reports[0].as_ref().unwrap();
    assert_eq!(report.entries().len(), 3);
    assert!(reports[1..].iter().all(Option::is_none));

    for &n in &plan.sizes {
        let (mat1, mat2) = plan.input_paths(n);
        let expected = multiply(
            &load_file(&mat1).unwrap(),
            &load_file(&mat2).unwrap(),
        )
        .unwrap();
        assert_eq!(load_file(&plan.result_path(n)).unwrap(), expected);
    }

    let verdicts = verify(&plan).unwrap();
    assert!(verdicts.iter().all(|(_, verdict)| *verdict == Verdict::Match));
    assert!(plan.report_path("distributed").exists());
}

#[tokio::test]
async fn test_silent_worker_times_out() {
    let options = GrpcOptions {
        connect_timeout: Duration::from_secs(5),
        recv_timeout: Some(Duration::from_millis(300)),
    };
    let mut world = start_world(2, options).await;
    // Rank 1 keeps its mailbox open but never joins the round.
    let _silent = world.pop().unwrap();
    let coordinator = world.pop().unwrap();

    let a = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let outcome = Worker::new(&coordinator)
        .run_round(Some((a.clone(), a)))
        .await;

    assert!(matches!(
        outcome,
        Err(Error::Comm(matmul_comm::Error::Timeout { .. }))
    ));
}
