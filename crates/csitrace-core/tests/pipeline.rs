mod support;

use std::fs;

use csitrace_core::protocols::csi::messages::{
    CapacityRange, CreateVolumeRequest, CreateVolumeResponse, DeleteVolumeRequest,
    DeleteVolumeResponse, ProbeRequest, ProbeResponse, Volume,
};
use csitrace_core::protocols::grpc::GrpcError;
use csitrace_core::protocols::http2::Http2Error;
use csitrace_core::{AnalysisError, CsiMessage, analyze_pcap_file, analyze_source};
use prost::Message;

use support::*;

fn create_volume_request(name: &str) -> CreateVolumeRequest {
    CreateVolumeRequest {
        name: name.to_string(),
        capacity_range: Some(CapacityRange {
            required_bytes: 1 << 30,
            limit_bytes: 0,
        }),
        ..Default::default()
    }
}

fn create_volume_response(volume_id: &str) -> CreateVolumeResponse {
    CreateVolumeResponse {
        volume: Some(Volume {
            capacity_bytes: 1 << 30,
            volume_id: volume_id.to_string(),
            ..Default::default()
        }),
    }
}

/// One CreateVolume call on stream 1: request at 100ms, response headers and
/// data at 250ms, trailers at 400ms.
fn single_call_capture(path: &str) -> Capture {
    let mut request = client_preface();
    request.extend(request_frames(
        1,
        path,
        "csi-provisioner",
        &create_volume_request("pvc-1").encode_to_vec(),
    ));
    let mut response = frame(TYPE_SETTINGS, 0, 0, &[]);
    response.extend(response_frames(1, &create_volume_response("vol-1").encode_to_vec()));

    let mut capture = Capture::new();
    capture
        .tcp(100, CLIENT, SERVER, &request)
        .tcp(250, SERVER, CLIENT, &response)
        .tcp(400, SERVER, CLIENT, &trailer_frame(1));
    capture
}

#[test]
fn single_paired_call_yields_one_record() {
    let capture = single_call_capture("/csi.v1.Controller/CreateVolume");
    let report = analyze_source(capture.source()).unwrap();

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.action, "CreateVolume");
    assert_eq!(record.path, "/csi.v1.Controller/CreateVolume");
    assert_eq!(record.agent.name, "csi-provisioner");
    assert_eq!(record.agent.ip.to_string(), "10.0.0.1");
    assert_eq!(record.agent.port, 40000);
    assert_eq!(record.timing.start, at_ms(100));
    assert_eq!(record.timing.end, at_ms(400));
    assert_eq!(record.timing.duration, 300_000_000);
    assert_eq!(
        record.request,
        CsiMessage::CreateVolumeRequest(create_volume_request("pvc-1"))
    );
    assert_eq!(
        record.response,
        CsiMessage::CreateVolumeResponse(create_volume_response("vol-1"))
    );

    assert_eq!(report.summary.packets, 3);
    assert_eq!(report.summary.byte_logs, 2);
    assert_eq!(report.summary.endpoint_pairs, 1);
    assert_eq!(report.summary.header_blocks, 3);
    assert_eq!(report.summary.calls_paired, 1);
    assert_eq!(report.summary.records, 1);
}

#[test]
fn missing_response_direction_yields_nothing() {
    let mut request = client_preface();
    request.extend(request_frames(
        1,
        "/csi.v1.Controller/CreateVolume",
        "csi-provisioner",
        &create_volume_request("pvc-1").encode_to_vec(),
    ));
    let mut capture = Capture::new();
    capture.tcp(100, CLIENT, SERVER, &request);

    let report = analyze_source(capture.source()).unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.summary.endpoint_pairs, 0);
}

#[test]
fn stream_without_counterpart_is_dropped() {
    let mut capture = single_call_capture("/csi.v1.Controller/CreateVolume");
    // Stream 3 only ever travels client -> server.
    capture.tcp(
        500,
        CLIENT,
        SERVER,
        &request_frames(3, "/csi.v1.Identity/Probe", "csi-provisioner", &[]),
    );

    let report = analyze_source(capture.source()).unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.summary.dropped_unpaired, 1);
}

#[test]
fn continuation_split_matches_single_headers_frame() {
    let message = create_volume_request("pvc-1").encode_to_vec();
    let block = request_block("/csi.v1.Controller/CreateVolume", "csi-provisioner");

    let mut split = client_preface();
    split.extend(frame(TYPE_HEADERS, 0, 1, &block[..4]));
    split.extend(frame(TYPE_CONTINUATION, 0, 1, &block[4..20]));
    split.extend(frame(TYPE_CONTINUATION, FLAG_END_HEADERS, 1, &block[20..]));
    split.extend(frame(TYPE_DATA, FLAG_END_STREAM, 1, &envelope(0, &message)));

    let mut capture = Capture::new();
    capture
        .tcp(100, CLIENT, SERVER, &split)
        .tcp(
            250,
            SERVER,
            CLIENT,
            &response_frames(1, &create_volume_response("vol-1").encode_to_vec()),
        )
        .tcp(400, SERVER, CLIENT, &trailer_frame(1));

    let split_report = analyze_source(capture.source()).unwrap();
    let single_report =
        analyze_source(single_call_capture("/csi.v1.Controller/CreateVolume").source()).unwrap();
    assert_eq!(split_report.records, single_report.records);
}

#[test]
fn frames_split_across_segments_are_reassembled() {
    let mut request = client_preface();
    request.extend(request_frames(
        1,
        "/csi.v1.Identity/Probe",
        "csi-attacher",
        &ProbeRequest {}.encode_to_vec(),
    ));
    let mut response = response_frames(1, &ProbeResponse { ready: Some(true) }.encode_to_vec());
    response.extend(trailer_frame(1));
    let (head, tail) = response.split_at(response.len() - 7);

    let mut capture = Capture::new();
    capture
        .tcp(100, CLIENT, SERVER, &request[..30])
        .tcp(110, CLIENT, SERVER, &request[30..])
        .tcp(200, SERVER, CLIENT, head)
        .tcp(300, SERVER, CLIENT, tail);

    let report = analyze_source(capture.source()).unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].timing.start, at_ms(110));
    assert_eq!(report.records[0].timing.end, at_ms(300));
    assert_eq!(
        report.records[0].response,
        CsiMessage::ProbeResponse(ProbeResponse { ready: Some(true) })
    );
}

#[test]
fn multiplexed_streams_pair_independently() {
    let mut capture = Capture::new();
    let create = create_volume_request("pvc-a").encode_to_vec();
    let delete = DeleteVolumeRequest {
        volume_id: "vol-b".to_string(),
        ..Default::default()
    }
    .encode_to_vec();

    let mut first = client_preface();
    first.extend(frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS,
        1,
        &request_block("/csi.v1.Controller/CreateVolume", "csi-provisioner"),
    ));
    first.extend(frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS,
        3,
        &request_block("/csi.v1.Controller/DeleteVolume", "csi-provisioner"),
    ));
    capture.tcp(100, CLIENT, SERVER, &first);
    capture.tcp(
        110,
        CLIENT,
        SERVER,
        &frame(TYPE_DATA, FLAG_END_STREAM, 3, &envelope(0, &delete)),
    );
    capture.tcp(
        120,
        CLIENT,
        SERVER,
        &frame(TYPE_DATA, FLAG_END_STREAM, 1, &envelope(0, &create)),
    );

    // Stream 3 completes before stream 1.
    let mut responses = response_frames(1, &create_volume_response("vol-a").encode_to_vec());
    responses.extend(response_frames(3, &DeleteVolumeResponse {}.encode_to_vec()));
    capture.tcp(200, SERVER, CLIENT, &responses);
    capture.tcp(300, SERVER, CLIENT, &trailer_frame(3));
    capture.tcp(400, SERVER, CLIENT, &trailer_frame(1));

    let report = analyze_source(capture.source()).unwrap();
    let actions: Vec<_> = report.records.iter().map(|r| r.action.as_str()).collect();
    assert_eq!(actions, ["DeleteVolume", "CreateVolume"]);
    assert_eq!(
        report.records[0].response,
        CsiMessage::DeleteVolumeResponse(DeleteVolumeResponse {})
    );
    assert_eq!(
        report.records[1].request,
        CsiMessage::CreateVolumeRequest(create_volume_request("pvc-a"))
    );
    assert_eq!(report.records[1].timing.end, at_ms(400));
}

#[test]
fn compressed_envelope_aborts_the_run() {
    let mut request = client_preface();
    request.extend(frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS,
        1,
        &request_block("/csi.v1.Identity/Probe", "csi-attacher"),
    ));
    request.extend(frame(TYPE_DATA, FLAG_END_STREAM, 1, &envelope(1, &[])));

    let mut capture = Capture::new();
    capture
        .tcp(100, CLIENT, SERVER, &request)
        .tcp(200, SERVER, CLIENT, &response_frames(1, &[]))
        .tcp(300, SERVER, CLIENT, &trailer_frame(1));

    let err = analyze_source(capture.source()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Grpc {
            source: GrpcError::Compressed { flag: 1 },
            ..
        }
    ));
}

#[test]
fn frame_running_past_end_of_capture_aborts_the_run() {
    let mut capture = single_call_capture("/csi.v1.Controller/CreateVolume");
    // Declares a 4 MiB DATA body, carries three bytes.
    capture.tcp(
        500,
        CLIENT,
        SERVER,
        &[0x40, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 3],
    );

    let err = analyze_source(capture.source()).unwrap_err();
    let AnalysisError::Http2 { src, dst, source } = &err else {
        panic!("expected an HTTP/2 error, got {err:?}");
    };
    assert_eq!(src.to_string(), CLIENT);
    assert_eq!(dst.to_string(), SERVER);
    assert!(matches!(
        source,
        Http2Error::Truncated {
            declared: 0x40_0009,
            available: 12,
            ..
        }
    ));
}

#[test]
fn output_is_sorted_by_response_completion() {
    let clients = ["10.0.0.5:41000", "10.0.0.3:42000", "10.0.0.4:43000"];
    // Completion order: second client, third client, first client.
    let trailers_at = [900u64, 500, 700];

    let mut capture = Capture::new();
    for (idx, client) in clients.iter().enumerate() {
        let mut request = client_preface();
        request.extend(request_frames(
            1,
            "/csi.v1.Identity/Probe",
            &format!("client-{idx}"),
            &[],
        ));
        capture.tcp(100 + idx as u64, client, SERVER, &request);
    }
    for (idx, client) in clients.iter().enumerate() {
        capture.tcp(
            200 + idx as u64,
            SERVER,
            client,
            &response_frames(1, &ProbeResponse { ready: Some(true) }.encode_to_vec()),
        );
    }
    for (idx, client) in clients.iter().enumerate() {
        capture.tcp(trailers_at[idx], SERVER, client, &trailer_frame(1));
    }

    let report = analyze_source(capture.source()).unwrap();
    let names: Vec<_> = report.records.iter().map(|r| r.agent.name.as_str()).collect();
    assert_eq!(names, ["client-1", "client-2", "client-0"]);
    assert!(
        report
            .records
            .windows(2)
            .all(|pair| pair[0].timing.end <= pair[1].timing.end)
    );
}

#[test]
fn unknown_method_is_dropped_without_error() {
    let capture = single_call_capture("/csi.v1.Controller/NotARealMethod");
    let report = analyze_source(capture.source()).unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.summary.calls_paired, 1);
    assert_eq!(report.summary.dropped_unknown_method, 1);
}

#[test]
fn non_tcp_packets_are_ignored() {
    let mut capture = single_call_capture("/csi.v1.Controller/CreateVolume");
    capture.udp(50, b"mdns");
    let report = analyze_source(capture.source()).unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.summary.packets, 4);
    assert_eq!(report.summary.tcp_segments, 3);
}

#[test]
fn legacy_pcap_and_pcapng_files_agree() {
    let capture = single_call_capture("/csi.v1.Controller/CreateVolume");
    let pcap = temp_path("call.pcap");
    let pcapng = temp_path("call.pcapng");
    capture.write_pcap(&pcap);
    capture.write_pcapng(&pcapng);

    let from_pcap = analyze_pcap_file(&pcap);
    let from_pcapng = analyze_pcap_file(&pcapng);
    let _ = fs::remove_file(&pcap);
    let _ = fs::remove_file(&pcapng);

    let from_pcap = from_pcap.unwrap();
    let from_pcapng = from_pcapng.unwrap();
    assert_eq!(from_pcap.records.len(), 1);
    assert_eq!(from_pcap.records, from_pcapng.records);
    assert_eq!(from_pcap.records[0].timing.start, at_ms(100));
}

#[test]
fn ndjson_output_has_stable_shape() {
    let report =
        analyze_source(single_call_capture("/csi.v1.Controller/CreateVolume").source()).unwrap();
    let mut out = Vec::new();
    report.write_ndjson(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let line = text.strip_suffix('\n').expect("trailing newline");
    assert!(!line.contains('\n'));

    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        keys,
        ["action", "agent", "path", "request", "response", "timing"]
    );
    assert!(line.starts_with(r#"{"action":"CreateVolume","path":"/csi.v1.Controller/CreateVolume","agent":"#));
    assert_eq!(value["timing"]["start"], "2023-11-14T22:13:20.1Z");
    assert_eq!(value["timing"]["end"], "2023-11-14T22:13:20.4Z");
    assert_eq!(value["timing"]["duration"], 300_000_000);
    assert_eq!(value["request"]["name"], "pvc-1");
    assert_eq!(value["request"]["capacity_range"]["required_bytes"], 1 << 30);
    assert_eq!(value["response"]["volume"]["volume_id"], "vol-1");
}
