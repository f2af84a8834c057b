//! Lexer and highlighter throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use inet_docs::{HighlightOptions, Highlighter, LexerRegistry};

const NED_SOURCE: &str = r#"package inet.node.inet;

import inet.applications.contract.IApp;
import inet.common.MessageDispatcher;

//
// IPv4/IPv6 host with applications and configurable interfaces.
//
module StandardHost extends ApplicationLayerNodeBase
{
    parameters:
        @display("i=device/pc2");
        @figure[submodules];
        int numApps = default(0);
        double startTime @unit(s) = default(uniform(0s, 1s));
        string osgModel = default("");
    gates:
        inout ethg[] @labels(EtherFrame-conn);
    submodules:
        app[numApps]: <> like IApp {
            @display("p=375,76,row,150");
        }
        at: MessageDispatcher {
            @display("p=750,146;b=1000,5,,,,1");
        }
    connections allowunconnected:
        for i=0..numApps-1 {
            app[i].socketOut --> at.in++;
            app[i].socketIn <-- at.out++;
        }
}
"#;

const MSG_SOURCE: &str = r#"import inet.common.packet.chunk.Chunk;

namespace inet;

cplusplus {{
#include "inet/common/Protocol.h"
}}

enum EtherType
{
    ETHERTYPE_IPv4 = 0x0800;
    ETHERTYPE_ARP = 0x0806;
}

class EthernetMacHeader extends FieldsChunk
{
    chunkLength = B(14);
    MacAddress dest;
    MacAddress src;
    int typeOrLength @enum(EtherType);
}
"#;

const INI_SOURCE: &str = "[General]\n\
network = StandardHostShowcase\n\
sim-time-limit = 10s\n\
# visualizer\n\
*.visualizer.*.routingTableVisualizer[0].displayRoutingTables = true\n\
\n\
[Config Wireless]\n\
extends = General\n\
*.host*.wlan[*].radio.transmitter.power = 2mW\n";

fn token_count(language: &str, source: &str) -> usize {
    LexerRegistry::global()
        .get(language)
        .map(|lexer| lexer.tokens(source).count())
        .unwrap_or(0)
}

fn bench_lexers(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for (language, source) in [("ned", NED_SOURCE), ("msg", MSG_SOURCE), ("ini", INI_SOURCE)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(language, |b| {
            b.iter(|| token_count(black_box(language), black_box(source)))
        });
    }

    group.finish();
}

fn bench_large_ned(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_large");
    let source = NED_SOURCE.repeat(200);
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("ned_x200", |b| {
        b.iter(|| token_count("ned", black_box(&source)))
    });

    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let highlighter = Highlighter::new();
    let options = HighlightOptions {
        linenos: true,
        ..HighlightOptions::default()
    };

    c.bench_function("highlight_ned_html", |b| {
        b.iter(|| highlighter.highlight(black_box(NED_SOURCE), "ned", &options))
    });
}

criterion_group!(benches, bench_lexers, bench_large_ned, bench_highlight);
criterion_main!(benches);
