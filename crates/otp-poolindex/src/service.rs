//! Command dispatch for one pool index connection (OTP §4.4).

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::table::RelayTable;

/// LIST command byte: reply with the serialized relay list, then close.
const CMD_LIST: u8 = 0x00;
/// HEARTBEAT command byte: refresh a relay record, reply with the next
/// requested delay, then close.
const CMD_HEARTBEAT: u8 = 0x01;

/// Read one command byte from `stream` and dispatch it.
///
/// Command bytes other than [`CMD_LIST`] or [`CMD_HEARTBEAT`] are dropped
/// and the connection closed (OTP §7, "Pool-index errors"). A partial
/// heartbeat frame that hits EOF is likewise dropped without touching
/// `table`: `table.heartbeat` is only called once the full host+port frame
/// has been read successfully.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    table: &RelayTable,
    requested_delay: u8,
    deprecation_delay: Duration,
) -> std::io::Result<()> {
    let mut stream = BufReader::new(stream);

    let mut command = [0u8; 1];
    stream.read_exact(&mut command).await?;

    match command[0] {
        CMD_LIST => {
            let buf = table.serialized_buffer();
            stream.write_all(&buf).await?;
        }
        CMD_HEARTBEAT => {
            let mut host_buf = Vec::new();
            stream.read_until(0x00, &mut host_buf).await?;
            if host_buf.pop() != Some(0x00) {
                // Stream EOFed before the NUL separator arrived: a partial
                // heartbeat, dropped without updating the table.
                return Ok(());
            }
            let host = String::from_utf8_lossy(&host_buf).into_owned();
            let port = stream.read_u16().await?;

            table.heartbeat(host, port, deprecation_delay);
            stream.write_all(&[requested_delay]).await?;
        }
        _ => {
            // Unknown command: drop the connection (OTP §7).
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::RelayTable;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpListener;

    async fn spawn_index() -> (std::net::SocketAddr, std::sync::Arc<RelayTable>) {
        let table = std::sync::Arc::new(RelayTable::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let table_clone = std::sync::Arc::clone(&table);
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let table = std::sync::Arc::clone(&table_clone);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, &table, 15, Duration::from_secs(30)).await;
                });
            }
        });
        (addr, table)
    }

    #[tokio::test]
    async fn heartbeat_then_list_round_trips() {
        let (addr, table) = spawn_index().await;

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[CMD_HEARTBEAT]).await.unwrap();
        conn.write_all(b"127.0.0.2\x00").await.unwrap();
        conn.write_all(&6000u16.to_be_bytes()).await.unwrap();
        let mut reply = [0u8; 1];
        conn.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], 15);
        assert_eq!(table.len(), 1);

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[CMD_LIST]).await.unwrap();
        let mut buf = Vec::new();
        conn.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, *b"127.0.0.2\x00\x17\x70");
    }

    #[tokio::test]
    async fn partial_heartbeat_does_not_update_table() {
        let (addr, table) = spawn_index().await;

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[CMD_HEARTBEAT]).await.unwrap();
        conn.write_all(b"127.0.0.2").await.unwrap();
        drop(conn);

        // Give the spawned handler a moment to observe EOF.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn unknown_command_is_dropped() {
        let (addr, table) = spawn_index().await;

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[0x42]).await.unwrap();
        let mut buf = [0u8; 1];
        let n = conn.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(table.len(), 0);
    }
}
